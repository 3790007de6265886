//! # warden-service
//!
//! Business logic service layer for Warden. Services orchestrate the
//! repositories, password handling, token issuance, and the identity
//! lifecycle hooks that keep the policy store's grouping relation in step
//! with the user store.
//!
//! Services follow constructor injection; all dependencies are provided
//! at construction time via `Arc` references.

pub mod auth;
pub mod context;
pub mod policy;
pub mod resource;
pub mod user;

pub use auth::AuthService;
pub use context::RequestContext;
pub use policy::PolicyService;
pub use resource::ResourceService;
pub use user::{UserService, seed_demo_users};
