//! # warden-entity
//!
//! Domain entity models for Warden. Every struct in this crate derives
//! `Debug`, `Clone`, `Serialize`, and `Deserialize`; stored entities also
//! implement [`warden_core::traits::Identifiable`].

pub mod resource;
pub mod user;
