//! Resource services.

pub mod service;

pub use service::ResourceService;
