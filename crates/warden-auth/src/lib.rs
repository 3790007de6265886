//! # warden-auth
//!
//! Authentication and identity plumbing around the policy engine.
//!
//! ## Modules
//!
//! - `jwt`: access token issuance and verification
//! - `password`: Argon2id password hashing and length policy
//! - `lifecycle`: hooks that keep the role graph in step with the user store

pub mod jwt;
pub mod lifecycle;
pub mod password;

pub use jwt::{Claims, IssuedToken, JwtDecoder, JwtEncoder};
pub use lifecycle::RoleLifecycle;
pub use password::{PasswordHasher, PasswordValidator};
