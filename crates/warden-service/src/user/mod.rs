//! User management services.

pub mod seed;
pub mod service;

pub use seed::seed_demo_users;
pub use service::{CreateUserRequest, UpdateUserRequest, UserService};
