//! User management: registration, admin CRUD, and self-service updates.
//!
//! Every operation that changes a user's username or role, or removes the
//! user, goes through the [`RoleLifecycle`] hooks. When a hook cannot save
//! the policy, the repository change is rolled back together with the
//! in-memory grouping change, and the `Persistence` error is returned.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use warden_auth::lifecycle::RoleLifecycle;
use warden_auth::password::{PasswordHasher, PasswordValidator};
use warden_core::traits::Repository;
use warden_core::{AppError, AppResult, ErrorKind};
use warden_database::repositories::UserRepository;
use warden_entity::user::{CreateUser, UpdateUser, User};
use warden_policy::store::validate_value;

use crate::context::RequestContext;

/// Handles user lifecycle operations.
#[derive(Debug, Clone)]
pub struct UserService {
    user_repo: Arc<UserRepository>,
    hasher: Arc<PasswordHasher>,
    validator: Arc<PasswordValidator>,
    roles: RoleLifecycle,
}

/// Data for creating a user.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    /// Plaintext password.
    pub password: String,
    pub full_name: Option<String>,
    pub role: String,
}

/// Partial update of a user. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    /// Plaintext password.
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl UserService {
    /// Creates a new user service.
    pub fn new(
        user_repo: Arc<UserRepository>,
        hasher: Arc<PasswordHasher>,
        validator: Arc<PasswordValidator>,
        roles: RoleLifecycle,
    ) -> Self {
        Self {
            user_repo,
            hasher,
            validator,
            roles,
        }
    }

    /// Self-registration.
    pub async fn register(&self, req: CreateUserRequest) -> AppResult<User> {
        let user = self.insert(req).await?;
        info!(user_id = %user.id, username = %user.username, role = %user.role, "User registered");
        Ok(user)
    }

    /// Creates a user on behalf of an administrator.
    pub async fn create_user(&self, ctx: &RequestContext, req: CreateUserRequest) -> AppResult<User> {
        let user = self.insert(req).await?;
        info!(
            actor = %ctx.username,
            user_id = %user.id,
            username = %user.username,
            role = %user.role,
            "User created"
        );
        Ok(user)
    }

    /// Lists all users, oldest first.
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.user_repo.list().await
    }

    /// Gets a single user by ID.
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        self.user_repo
            .get(&user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// Updates any user. Username and role changes are mirrored into the
    /// grouping relation.
    pub async fn update_user(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        req: UpdateUserRequest,
    ) -> AppResult<User> {
        let existing = self.get_user(user_id).await?;
        if let Some(username) = &req.username {
            let role = req.role.as_deref().unwrap_or(&existing.role);
            self.ensure_username_free(username, Some(existing.username.as_str()), role)?;
        }
        if let Some(role) = &req.role {
            self.ensure_role_free(role).await?;
        }
        let update = self.prepare_update(req)?;

        let mut updated = existing.clone();
        updated.apply(update);
        if updated.username == updated.role {
            return Err(name_is_role(&updated.username));
        }
        let before = self
            .roles
            .snapshot(&[existing.username.as_str(), updated.username.as_str()]);
        let updated = self.user_repo.save(updated).await?;

        if let Err(e) = self
            .roles
            .on_user_updated(&existing.username, &existing.role, &updated.username, &updated.role)
            .await
        {
            self.restore(&existing).await;
            if e.is(ErrorKind::Persistence) {
                self.roles.revert_user_updated(&before);
            }
            return Err(e);
        }

        info!(
            actor = %ctx.username,
            user_id = %updated.id,
            username = %updated.username,
            role = %updated.role,
            is_active = updated.is_active,
            "User updated"
        );
        Ok(updated)
    }

    /// Updates the caller's own profile. The role cannot be changed here.
    pub async fn update_me(&self, ctx: &RequestContext, mut req: UpdateUserRequest) -> AppResult<User> {
        req.role = None;
        self.update_user(ctx, ctx.user_id, req).await
    }

    /// Deletes a user and revokes its role assignments.
    pub async fn delete_user(&self, ctx: &RequestContext, user_id: Uuid) -> AppResult<User> {
        let user = self
            .user_repo
            .delete(&user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        let held = self.roles.enforcer().roles_for_user(&user.username);

        if let Err(e) = self.roles.on_user_deleted(&user.username).await {
            self.restore(&user).await;
            if e.is(ErrorKind::Persistence) {
                self.roles.revert_user_deleted(&user.username, &held);
            }
            return Err(e);
        }

        info!(
            actor = %ctx.username,
            user_id = %user.id,
            username = %user.username,
            roles = ?held,
            "User deleted"
        );
        Ok(user)
    }

    /// Checks credentials, returning the user on success.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        let invalid = || AppError::validation("Incorrect username or password");
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(invalid)?;
        if !self.hasher.verify(password, &user.password_hash)? {
            return Err(invalid());
        }
        Ok(user)
    }

    pub async fn count(&self) -> usize {
        self.user_repo.count().await
    }

    async fn insert(&self, req: CreateUserRequest) -> AppResult<User> {
        validate_value("username", &req.username)?;
        validate_value("role", &req.role)?;
        validate_email(&req.email)?;
        self.validator.validate(&req.password)?;
        self.ensure_username_free(&req.username, None, &req.role)?;
        self.ensure_role_free(&req.role).await?;
        if req.username == req.role {
            return Err(name_is_role(&req.username));
        }

        let user = User::new(CreateUser {
            email: req.email,
            username: req.username,
            password_hash: self.hasher.hash(&req.password)?,
            full_name: req.full_name,
            role: req.role,
        });
        let user = self.user_repo.save(user).await?;

        if let Err(e) = self.roles.on_user_created(&user.username, &user.role).await {
            if let Err(rollback) = self.user_repo.delete(&user.id).await {
                warn!(user_id = %user.id, error = %rollback, "Failed to roll back user creation");
            }
            if e.is(ErrorKind::Persistence) {
                self.roles.revert_user_created(&user.username, &user.role);
            }
            return Err(e);
        }
        Ok(user)
    }

    fn prepare_update(&self, req: UpdateUserRequest) -> AppResult<UpdateUser> {
        if let Some(username) = &req.username {
            validate_value("username", username)?;
        }
        if let Some(role) = &req.role {
            validate_value("role", role)?;
        }
        if let Some(email) = &req.email {
            validate_email(email)?;
        }
        let password_hash = match req.password.as_deref() {
            Some(password) => {
                self.validator.validate(password)?;
                Some(self.hasher.hash(password)?)
            }
            None => None,
        };

        Ok(UpdateUser {
            email: req.email,
            username: req.username,
            full_name: req.full_name,
            password_hash,
            role: req.role,
            is_active: req.is_active,
        })
    }

    /// Refuse a username that names a role, or that already holds role
    /// assignments beyond `role` and whatever `current` brings along.
    fn ensure_username_free(
        &self,
        username: &str,
        current: Option<&str>,
        role: &str,
    ) -> AppResult<()> {
        if current == Some(username) {
            return Ok(());
        }
        let enforcer = self.roles.enforcer();
        if enforcer.is_role_name(username) {
            return Err(name_is_role(username));
        }
        let held = enforcer.roles_for_user(username);
        let mut allowed = match current {
            Some(current) => enforcer.roles_for_user(current),
            None => Vec::new(),
        };
        allowed.push(role.to_string());
        if held.iter().any(|r| !allowed.contains(r)) {
            warn!(username = %username, roles = ?held, "Username already holds role assignments");
            return Err(AppError::conflict(format!(
                "Username '{username}' already holds role assignments"
            )));
        }
        Ok(())
    }

    /// A role may not share its name with an existing user.
    async fn ensure_role_free(&self, role: &str) -> AppResult<()> {
        if self.user_repo.find_by_username(role).await?.is_some() {
            return Err(AppError::conflict(format!(
                "Role '{role}' is already a username"
            )));
        }
        Ok(())
    }

    async fn restore(&self, user: &User) {
        if let Err(e) = self.user_repo.put(user.clone()).await {
            warn!(user_id = %user.id, error = %e, "Failed to restore user after hook failure");
        }
    }
}

fn name_is_role(username: &str) -> AppError {
    AppError::conflict(format!("Username '{username}' is already a role name"))
}

fn validate_email(email: &str) -> AppResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::validation(format!("Invalid email address '{email}'"))),
    }
}
