//! Request context carrying the authenticated actor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use warden_entity::user::User;

/// Context for the current authenticated request.
///
/// Built by the HTTP layer once the caller is authenticated and passed into
/// service methods so that every operation knows *who* is acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: Uuid,
    /// The authenticated user's current username.
    pub username: String,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(user_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            request_time: Utc::now(),
        }
    }

    /// Context for a request made by `user`.
    pub fn for_user(user: &User) -> Self {
        Self::new(user.id, user.username.clone())
    }

    /// Context for startup tasks that act on behalf of the server itself.
    pub fn system() -> Self {
        Self::new(Uuid::nil(), "system")
    }
}
