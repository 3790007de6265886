//! Runtime administration of policy rules.
//!
//! Each mutation is saved immediately. If the save fails the in-memory
//! change is undone and the `Persistence` error is returned.

use std::sync::Arc;

use tracing::info;

use warden_core::AppResult;
use warden_policy::{Enforcer, GroupingRule, PolicyRule};

use crate::context::RequestContext;

#[derive(Debug, Clone)]
pub struct PolicyService {
    enforcer: Arc<Enforcer>,
}

impl PolicyService {
    pub fn new(enforcer: Arc<Enforcer>) -> Self {
        Self { enforcer }
    }

    pub fn list_policies(&self) -> Vec<PolicyRule> {
        self.enforcer.policies()
    }

    pub fn list_grouping_rules(&self) -> Vec<GroupingRule> {
        self.enforcer.grouping_rules()
    }

    /// Grant `action` on `object` to `role`. Returns `false` if the grant
    /// already existed, in which case nothing is saved.
    pub async fn add_policy(
        &self,
        ctx: &RequestContext,
        role: &str,
        object: &str,
        action: &str,
    ) -> AppResult<bool> {
        if !self.enforcer.add_policy(role, object, action)? {
            return Ok(false);
        }
        if let Err(e) = self.enforcer.save_policy().await {
            self.enforcer.remove_policy(role, object, action);
            return Err(e);
        }
        info!(actor = %ctx.username, role = %role, object = %object, action = %action, "Policy granted");
        Ok(true)
    }

    /// Withdraw a grant. Returns `false` if it did not exist.
    pub async fn remove_policy(
        &self,
        ctx: &RequestContext,
        role: &str,
        object: &str,
        action: &str,
    ) -> AppResult<bool> {
        if !self.enforcer.remove_policy(role, object, action) {
            return Ok(false);
        }
        if let Err(e) = self.enforcer.save_policy().await {
            self.enforcer.add_policy(role, object, action)?;
            return Err(e);
        }
        info!(actor = %ctx.username, role = %role, object = %object, action = %action, "Policy revoked");
        Ok(true)
    }
}
