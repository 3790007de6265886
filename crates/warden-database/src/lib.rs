//! # warden-database
//!
//! Repository implementations for Warden entities. Storage is in-memory:
//! the user store is a demonstration collaborator, while the policy store
//! is the only durable state.

pub mod memory;
pub mod repositories;

pub use memory::MemoryStore;
pub use repositories::{ResourceRepository, UserRepository};
