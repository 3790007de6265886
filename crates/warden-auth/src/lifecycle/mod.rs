//! Identity lifecycle hooks.

pub mod roles;

pub use roles::{RoleLifecycle, RoleSnapshot};
