//! Request evaluation.

use clap::Args;
use serde::Serialize;

use warden_policy::Enforcer;

use crate::output::{self, OutputFormat};

/// Arguments for `check`
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Subject (username or role)
    pub subject: String,
    /// Object (e.g. `/users`)
    pub object: String,
    /// Action (e.g. `GET`)
    pub action: String,
}

#[derive(Debug, Serialize)]
struct Decision<'a> {
    subject: &'a str,
    object: &'a str,
    action: &'a str,
    allowed: bool,
    roles: Vec<String>,
}

/// Prints the decision and returns it.
pub fn execute(args: &CheckArgs, enforcer: &Enforcer, format: OutputFormat) -> bool {
    let allowed = enforcer.enforce(&args.subject, &args.object, &args.action);
    let decision = Decision {
        subject: &args.subject,
        object: &args.object,
        action: &args.action,
        allowed,
        roles: enforcer.implicit_roles_for_user(&args.subject),
    };

    let verdict = if allowed { "ALLOW" } else { "DENY" };
    let summary = format!(
        "{verdict}: {} {} {}",
        args.subject, args.action, args.object
    );
    output::print_item(&decision, &summary, format);
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_policy::{PolicyModel, PolicyStore};

    #[test]
    fn test_check_returns_decision() {
        let model = PolicyModel::default_rbac().unwrap();
        let store = PolicyStore::parse("p, admin, /users, GET\ng, alice, admin\n", &model).unwrap();
        let enforcer = Enforcer::new(model, store, "unused.csv");

        let args = CheckArgs {
            subject: "alice".into(),
            object: "/users".into(),
            action: "GET".into(),
        };
        assert!(execute(&args, &enforcer, OutputFormat::Json));

        let args = CheckArgs {
            subject: "bob".into(),
            ..args
        };
        assert!(!execute(&args, &enforcer, OutputFormat::Json));
    }
}
