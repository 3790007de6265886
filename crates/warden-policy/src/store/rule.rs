//! Policy and grouping rule tuples.

use std::fmt;

use serde::{Deserialize, Serialize};
use warden_core::{AppError, AppResult};

/// A positional policy tuple, `(role, object, action[, eft])` in the
/// conventional model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyRule {
    values: Vec<String>,
}

impl PolicyRule {
    /// Build a rule from positional values. Arity is checked by the model.
    pub fn from_values(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).map(String::as_str)
    }

    /// The subject (role) position.
    pub fn subject(&self) -> &str {
        self.get(0).unwrap_or_default()
    }

    /// The object position.
    pub fn object(&self) -> &str {
        self.get(1).unwrap_or_default()
    }

    /// The action position.
    pub fn action(&self) -> &str {
        self.get(2).unwrap_or_default()
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.values.join(", "))
    }
}

/// `g(subject, role)`: subject inherits every permission of role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupingRule {
    pub subject: String,
    pub role: String,
}

impl GroupingRule {
    pub fn new(subject: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
        }
    }
}

/// Check that a value can be stored and read back from the policy file
/// unchanged.
pub fn validate_value(field: &str, value: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.trim() != value {
        return Err(AppError::validation(format!(
            "{field} must not start or end with whitespace"
        )));
    }
    if value.contains([',', '\n', '\r']) {
        return Err(AppError::validation(format!(
            "{field} must not contain commas or line breaks"
        )));
    }
    Ok(())
}
