//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use warden_service::user::{CreateUserRequest as SvcCreateUser, UpdateUserRequest as SvcUpdateUser};

/// Login form body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Registration and admin user-creation body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserBody {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub full_name: Option<String>,
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

impl From<CreateUserBody> for SvcCreateUser {
    fn from(body: CreateUserBody) -> Self {
        Self {
            email: body.email,
            username: body.username,
            password: body.password,
            full_name: body.full_name,
            role: body.role,
        }
    }
}

/// Admin update of any user. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUserBody {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub username: Option<String>,
    pub full_name: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    #[validate(length(min = 1))]
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl From<UpdateUserBody> for SvcUpdateUser {
    fn from(body: UpdateUserBody) -> Self {
        Self {
            email: body.email,
            username: body.username,
            full_name: body.full_name,
            password: body.password,
            role: body.role,
            is_active: body.is_active,
        }
    }
}

/// Self-service profile update. There is no role field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateMeBody {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub username: Option<String>,
    pub full_name: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

impl From<UpdateMeBody> for SvcUpdateUser {
    fn from(body: UpdateMeBody) -> Self {
        Self {
            email: body.email,
            username: body.username,
            full_name: body.full_name,
            password: body.password,
            ..Default::default()
        }
    }
}

/// A `(role, object, action)` policy rule.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PolicyBody {
    #[validate(length(min = 1))]
    pub role: String,
    #[validate(length(min = 1))]
    pub object: String,
    #[validate(length(min = 1))]
    pub action: String,
}
