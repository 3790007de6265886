//! Entity-specific repositories.

pub mod resource;
pub mod user;

pub use resource::ResourceRepository;
pub use user::UserRepository;
