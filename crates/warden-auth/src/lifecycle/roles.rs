//! Keeps the grouping relation consistent with user-store changes.
//!
//! Each hook applies its grouping mutations and then saves the policy once.
//! When the save fails the in-memory mutation stays applied and the
//! `Persistence` error is returned; callers undo it with the matching
//! `revert_*` method, which restores memory to what is still on disk.

use std::sync::Arc;

use tracing::{error, info};
use warden_core::AppResult;
use warden_policy::Enforcer;
use warden_policy::store::validate_value;

/// Direct role assignments of a few users, captured before an update hook.
#[derive(Debug, Clone, Default)]
pub struct RoleSnapshot {
    held: Vec<(String, Vec<String>)>,
}

/// Lifecycle hooks over a shared enforcer.
#[derive(Debug, Clone)]
pub struct RoleLifecycle {
    enforcer: Arc<Enforcer>,
}

impl RoleLifecycle {
    pub fn new(enforcer: Arc<Enforcer>) -> Self {
        Self { enforcer }
    }

    pub fn enforcer(&self) -> &Arc<Enforcer> {
        &self.enforcer
    }

    /// A user was created with `role`.
    pub async fn on_user_created(&self, username: &str, role: &str) -> AppResult<()> {
        self.enforcer.add_role_for_user(username, role)?;
        self.save("user_created", username).await?;
        info!(username = %username, role = %role, "Role granted to new user");
        Ok(())
    }

    pub fn revert_user_created(&self, username: &str, role: &str) {
        self.enforcer.remove_role_for_user(username, role);
    }

    /// A user was updated. Handles a rename, a role change, or both, with
    /// a single save.
    ///
    /// A rename moves every direct assignment of `old_username` to
    /// `new_username`; a role change then swaps `old_role` for `new_role`.
    pub async fn on_user_updated(
        &self,
        old_username: &str,
        old_role: &str,
        new_username: &str,
        new_role: &str,
    ) -> AppResult<()> {
        let renamed = old_username != new_username;
        let role_changed = old_role != new_role;
        if !renamed && !role_changed {
            return Ok(());
        }
        if renamed {
            validate_value("username", new_username)?;
        }
        if role_changed {
            validate_value("role", new_role)?;
        }

        if renamed {
            for role in self.enforcer.roles_for_user(old_username) {
                self.enforcer.add_role_for_user(new_username, &role)?;
            }
            self.enforcer.delete_roles_for_user(old_username);
        }
        if role_changed {
            self.enforcer.add_role_for_user(new_username, new_role)?;
            self.enforcer.remove_role_for_user(new_username, old_role);
        }

        self.save("user_updated", new_username).await?;
        info!(
            old_username = %old_username,
            new_username = %new_username,
            old_role = %old_role,
            new_role = %new_role,
            "User role assignments updated"
        );
        Ok(())
    }

    /// Direct role assignments of `usernames` as they are now.
    ///
    /// Take this before [`Self::on_user_updated`] and hand it to
    /// [`Self::revert_user_updated`] if the hook fails.
    pub fn snapshot(&self, usernames: &[&str]) -> RoleSnapshot {
        let mut held: Vec<(String, Vec<String>)> = Vec::with_capacity(usernames.len());
        for username in usernames {
            if held.iter().all(|(name, _)| name != username) {
                held.push((username.to_string(), self.enforcer.roles_for_user(username)));
            }
        }
        RoleSnapshot { held }
    }

    /// Undo the in-memory effect of a failed [`Self::on_user_updated`].
    ///
    /// Every name in `before` gets exactly the direct roles it held when the
    /// snapshot was taken, so assignments that predate the hook survive.
    pub fn revert_user_updated(&self, before: &RoleSnapshot) {
        for (username, roles) in &before.held {
            for current in self.enforcer.roles_for_user(username) {
                if !roles.contains(&current) {
                    self.enforcer.remove_role_for_user(username, &current);
                }
            }
            self.restore_roles(username, roles);
        }
    }

    /// A user's role changed from `old_role` to `new_role`.
    pub async fn on_user_role_changed(
        &self,
        username: &str,
        old_role: &str,
        new_role: &str,
    ) -> AppResult<()> {
        self.on_user_updated(username, old_role, username, new_role)
            .await
    }

    /// A user was renamed; its direct role assignments move to the new name.
    pub async fn on_user_renamed(&self, old_username: &str, new_username: &str) -> AppResult<()> {
        self.on_user_updated(old_username, "", new_username, "")
            .await
    }

    /// A user was deleted. Returns the roles that were revoked.
    pub async fn on_user_deleted(&self, username: &str) -> AppResult<Vec<String>> {
        let revoked = self.enforcer.delete_roles_for_user(username);
        self.save("user_deleted", username).await?;
        info!(username = %username, roles = ?revoked, "Roles revoked from deleted user");
        Ok(revoked)
    }

    /// Restore the roles a failed deletion revoked.
    pub fn revert_user_deleted(&self, username: &str, revoked: &[String]) {
        self.restore_roles(username, revoked);
    }

    async fn save(&self, hook: &str, username: &str) -> AppResult<()> {
        self.enforcer.save_policy().await.inspect_err(|e| {
            error!(hook = %hook, username = %username, error = %e, "Policy save failed after lifecycle hook");
        })
    }

    fn restore_roles<I, S>(&self, username: &str, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for role in roles {
            // Restored values were accepted once already.
            let _ = self.enforcer.add_role_for_user(username, role.as_ref());
        }
    }
}
