//! Role assignment CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use warden_core::AppResult;
use warden_policy::{Enforcer, GroupingRule};

use crate::output::{self, OutputFormat};

/// Arguments for role commands
#[derive(Debug, Args)]
pub struct RoleArgs {
    /// Role subcommand
    #[command(subcommand)]
    pub command: RoleCommand,
}

/// Role subcommands
#[derive(Debug, Subcommand)]
pub enum RoleCommand {
    /// List role assignments, or the roles one user holds
    List {
        /// Only this user's roles, direct and inherited
        user: Option<String>,
    },
    /// List the direct members of a role
    Members { role: String },
    /// Assign a role to a user
    Add { user: String, role: String },
    /// Revoke one role, or every role when none is given
    Remove { user: String, role: Option<String> },
}

/// Role assignment display row
#[derive(Debug, Serialize, Tabled)]
struct RoleRow {
    subject: String,
    role: String,
    /// `direct` or `inherited`
    source: String,
}

impl RoleRow {
    fn new(subject: &str, role: &str, source: &str) -> Self {
        Self {
            subject: subject.to_string(),
            role: role.to_string(),
            source: source.to_string(),
        }
    }
}

/// Execute role commands
pub async fn execute(args: &RoleArgs, enforcer: &Enforcer, format: OutputFormat) -> AppResult<bool> {
    match &args.command {
        RoleCommand::List { user: None } => {
            let rows: Vec<RoleRow> = enforcer
                .grouping_rules()
                .iter()
                .map(|GroupingRule { subject, role }| RoleRow::new(subject, role, "direct"))
                .collect();
            output::print_list(&rows, format);
        }
        RoleCommand::List { user: Some(user) } => {
            output::print_list(&user_roles(enforcer, user), format);
        }
        RoleCommand::Members { role } => {
            let rows: Vec<RoleRow> = enforcer
                .users_for_role(role)
                .iter()
                .map(|member| RoleRow::new(member, role, "direct"))
                .collect();
            output::print_list(&rows, format);
        }
        RoleCommand::Add { user, role } => {
            if enforcer.add_role_for_user(user, role)? {
                enforcer.save_policy().await?;
                output::print_success(&format!("Assigned '{role}' to '{user}'"));
            } else {
                output::print_warning(&format!("'{user}' already has role '{role}'"));
            }
        }
        RoleCommand::Remove {
            user,
            role: Some(role),
        } => {
            if enforcer.remove_role_for_user(user, role) {
                enforcer.save_policy().await?;
                output::print_success(&format!("Revoked '{role}' from '{user}'"));
            } else {
                output::print_warning(&format!("'{user}' does not have role '{role}'"));
            }
        }
        RoleCommand::Remove { user, role: None } => {
            let revoked = enforcer.delete_roles_for_user(user);
            if revoked.is_empty() {
                output::print_warning(&format!("'{user}' has no roles"));
            } else {
                enforcer.save_policy().await?;
                output::print_success(&format!(
                    "Revoked {} from '{user}'",
                    revoked.join(", ")
                ));
            }
        }
    }
    Ok(true)
}

fn user_roles(enforcer: &Enforcer, user: &str) -> Vec<RoleRow> {
    let direct = enforcer.roles_for_user(user);
    enforcer
        .implicit_roles_for_user(user)
        .iter()
        .map(|role| {
            let source = if direct.contains(role) { "direct" } else { "inherited" };
            RoleRow::new(user, role, source)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_policy::{PolicyModel, PolicyStore};

    #[test]
    fn test_user_roles_marks_inherited() {
        let model = PolicyModel::default_rbac().unwrap();
        let store =
            PolicyStore::parse("g, alice, manager\ng, manager, admin\n", &model).unwrap();
        let enforcer = Enforcer::new(model, store, "unused.csv");

        let rows = user_roles(&enforcer, "alice");
        assert_eq!(rows.len(), 2);
        let admin = rows.iter().find(|r| r.role == "admin").unwrap();
        assert_eq!(admin.source, "inherited");
        let manager = rows.iter().find(|r| r.role == "manager").unwrap();
        assert_eq!(manager.source, "direct");
    }
}
