//! User repository.

use async_trait::async_trait;
use uuid::Uuid;

use warden_core::result::AppResult;
use warden_core::traits::Repository;
use warden_entity::user::User;

use crate::memory::MemoryStore;

/// User storage with uniqueness on username and email.
#[derive(Debug, Clone, Default)]
pub struct UserRepository {
    store: MemoryStore<User>,
}

impl UserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a user by exact username. Usernames are policy subjects, so
    /// matching is case-sensitive.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self.store.find(|u| u.username == username).await)
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .store
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .await)
    }

    /// Insert or replace a user, rejecting a username or email already
    /// held by a different user with a `Conflict` error.
    pub async fn save(&self, user: User) -> AppResult<User> {
        self.store.put_unique(user, identity_clash).await
    }

    /// List all users, oldest first.
    pub async fn list_ordered(&self) -> AppResult<Vec<User>> {
        let mut users = self.store.list().await?;
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    pub async fn count(&self) -> usize {
        self.store.len().await
    }
}

fn identity_clash(existing: &User, candidate: &User) -> Option<String> {
    if existing.username == candidate.username {
        Some(format!("Username '{}' is already taken", candidate.username))
    } else if existing.email.eq_ignore_ascii_case(&candidate.email) {
        Some(format!("Email '{}' is already registered", candidate.email))
    } else {
        None
    }
}

#[async_trait]
impl Repository<User> for UserRepository {
    async fn get(&self, id: &Uuid) -> AppResult<Option<User>> {
        self.store.get(id).await
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        self.list_ordered().await
    }

    async fn put(&self, user: User) -> AppResult<User> {
        self.save(user).await
    }

    async fn delete(&self, id: &Uuid) -> AppResult<Option<User>> {
        self.store.delete(id).await
    }
}
