//! Policy rule management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use warden_core::AppResult;
use warden_policy::{Enforcer, PolicyRule};

use crate::output::{self, OutputFormat};

/// Arguments for policy commands
#[derive(Debug, Args)]
pub struct PolicyArgs {
    /// Policy subcommand
    #[command(subcommand)]
    pub command: PolicyCommand,
}

/// Policy subcommands
#[derive(Debug, Subcommand)]
pub enum PolicyCommand {
    /// List policy rules
    List {
        /// Only rules granted to this role
        #[arg(short, long, conflicts_with = "user")]
        role: Option<String>,
        /// Every rule reachable by this user through its roles
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Grant an action on an object to a role
    Add {
        role: String,
        object: String,
        action: String,
        /// Explicit rule effect (`allow` or `deny`); the model must declare `eft`
        #[arg(long)]
        effect: Option<String>,
    },
    /// Withdraw a grant
    Remove {
        role: String,
        object: String,
        action: String,
        /// Effect of the rule to withdraw; needed to remove a `deny` rule
        #[arg(long)]
        effect: Option<String>,
    },
}

/// Policy rule display row
#[derive(Debug, Serialize, Tabled)]
pub(crate) struct PolicyRow {
    role: String,
    object: String,
    action: String,
}

impl From<&PolicyRule> for PolicyRow {
    fn from(rule: &PolicyRule) -> Self {
        Self {
            role: rule.subject().to_string(),
            object: rule.object().to_string(),
            action: rule.action().to_string(),
        }
    }
}

/// Execute policy commands
pub async fn execute(
    args: &PolicyArgs,
    enforcer: &Enforcer,
    format: OutputFormat,
) -> AppResult<bool> {
    match &args.command {
        PolicyCommand::List { role, user } => {
            let rules = match (role, user) {
                (_, Some(user)) => enforcer.implicit_permissions_for_user(user),
                (Some(role), None) => enforcer.permissions_for_user(role),
                (None, None) => enforcer.policies(),
            };
            let rows: Vec<PolicyRow> = rules.iter().map(PolicyRow::from).collect();
            output::print_list(&rows, format);
        }
        PolicyCommand::Add {
            role,
            object,
            action,
            effect,
        } => {
            let added = match effect {
                Some(effect) => enforcer.add_policy_values(vec![
                    role.clone(),
                    object.clone(),
                    action.clone(),
                    effect.clone(),
                ])?,
                None => enforcer.add_policy(role, object, action)?,
            };
            if added {
                enforcer.save_policy().await?;
                output::print_success(&format!("Granted {action} {object} to '{role}'"));
            } else {
                output::print_warning(&format!("'{role}' already has {action} {object}"));
            }
        }
        PolicyCommand::Remove {
            role,
            object,
            action,
            effect,
        } => {
            let removed = match effect {
                Some(effect) => enforcer.remove_policy_values(vec![
                    role.clone(),
                    object.clone(),
                    action.clone(),
                    effect.clone(),
                ])?,
                None => enforcer.remove_policy(role, object, action),
            };
            if removed {
                enforcer.save_policy().await?;
                output::print_success(&format!("Revoked {action} {object} from '{role}'"));
            } else {
                output::print_warning(&format!("'{role}' has no {action} {object} grant"));
            }
        }
    }
    Ok(true)
}
