//! # warden-policy
//!
//! The policy engine behind Warden's authorization gates.
//!
//! ## Modules
//!
//! - `model`: the declarative policy model: request/policy shapes, role
//!   definitions, effect, and the parsed matcher expression
//! - `store`: the mutable set of policy and grouping rules, its role graph,
//!   and the line-oriented policy file format
//! - `enforcer`: evaluation of `(subject, object, action)` requests and the
//!   role/policy mutation API

pub mod enforcer;
pub mod model;
pub mod store;

pub use enforcer::Enforcer;
pub use model::{Effect, Matcher, PolicyModel, RuleEffect};
pub use store::{GroupingRule, PolicyRule, PolicyStore, RoleGraph};
