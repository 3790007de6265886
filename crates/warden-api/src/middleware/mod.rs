//! Axum middleware stack.

pub mod authorization;
pub mod cors;
pub mod logging;
