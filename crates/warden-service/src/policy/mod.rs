//! Policy administration services.

pub mod service;

pub use service::PolicyService;
