//! Login, registration, and token resolution.

use std::sync::Arc;

use tracing::info;

use warden_auth::jwt::{Claims, IssuedToken, JwtDecoder, JwtEncoder};
use warden_core::traits::Repository;
use warden_core::{AppError, AppResult};
use warden_database::repositories::UserRepository;
use warden_entity::user::User;

use crate::user::{CreateUserRequest, UserService};

/// Issues and resolves access tokens.
#[derive(Debug, Clone)]
pub struct AuthService {
    users: Arc<UserService>,
    user_repo: Arc<UserRepository>,
    encoder: Arc<JwtEncoder>,
    decoder: Arc<JwtDecoder>,
}

impl AuthService {
    pub fn new(
        users: Arc<UserService>,
        user_repo: Arc<UserRepository>,
        encoder: Arc<JwtEncoder>,
        decoder: Arc<JwtDecoder>,
    ) -> Self {
        Self {
            users,
            user_repo,
            encoder,
            decoder,
        }
    }

    /// Exchange credentials for an access token.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<IssuedToken> {
        let user = self.users.authenticate(username, password).await?;
        let token = self.encoder.issue(&user)?;
        info!(user_id = %user.id, username = %user.username, "User logged in");
        Ok(token)
    }

    /// Register a new account and log it in.
    pub async fn register(&self, req: CreateUserRequest) -> AppResult<(User, IssuedToken)> {
        let user = self.users.register(req).await?;
        let token = self.encoder.issue(&user)?;
        Ok((user, token))
    }

    /// Verify a token's signature and expiry.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        self.decoder.decode(token)
    }

    /// Resolve a token to the user it was issued for.
    ///
    /// An invalid token is an `Authentication` error; a valid token whose
    /// user no longer exists is `NotFound`.
    pub async fn resolve(&self, token: &str) -> AppResult<User> {
        let claims = self.verify(token)?;
        self.user_repo
            .get(&claims.user_id())
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }
}
