//! Custom Axum extractors.

pub mod auth;
pub mod permissions;

pub use auth::{Authorized, CurrentUser, bearer_token};
pub use permissions::RoutePermission;
