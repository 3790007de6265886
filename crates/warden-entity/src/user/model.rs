//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::traits::Identifiable;

/// A registered user.
///
/// `role` names a role in the policy store's grouping relation; the user
/// is linked to it by `username`, so renames must be mirrored there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Email address, unique across users.
    pub email: String,
    /// Unique login name. Also the subject in grouping rules.
    pub username: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Human-readable display name.
    pub full_name: Option<String>,
    /// Assigned role.
    pub role: String,
    /// Inactive users authenticate but are refused by the gates.
    pub is_active: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new active user from creation data.
    pub fn new(data: CreateUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: data.email,
            username: data.username,
            password_hash: data.password_hash,
            full_name: data.full_name,
            role: data.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, stamping `updated_at`.
    pub fn apply(&mut self, update: UpdateUser) {
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(username) = update.username {
            self.username = username;
        }
        if let Some(full_name) = update.full_name {
            self.full_name = Some(full_name);
        }
        if let Some(password_hash) = update.password_hash {
            self.password_hash = password_hash;
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
    }
}

impl Identifiable for User {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Data required to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub username: String,
    /// Pre-hashed password.
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: String,
}

/// A partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    /// Pre-hashed password.
    pub password_hash: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User::new(CreateUser {
            email: "alice@example.com".into(),
            username: "alice".into(),
            password_hash: "hash".into(),
            full_name: None,
            role: "user".into(),
        })
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(alice()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
        assert_eq!(json["is_active"], true);
    }

    #[test]
    fn test_apply_partial_update() {
        let mut user = alice();
        let before = user.updated_at;
        user.apply(UpdateUser {
            role: Some("manager".into()),
            is_active: Some(false),
            ..Default::default()
        });
        assert_eq!(user.role, "manager");
        assert!(!user.is_active);
        assert_eq!(user.username, "alice");
        assert!(user.updated_at >= before);
    }
}
