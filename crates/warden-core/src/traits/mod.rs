//! Core traits defined in `warden-core` and implemented by other crates.

pub mod repository;

pub use repository::{Identifiable, Repository};
