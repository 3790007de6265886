//! HTTP request handlers.

pub mod auth;
pub mod health;
pub mod policies;
pub mod resources;
pub mod users;
