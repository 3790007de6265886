//! Model and policy file validation.

use serde::Serialize;

use warden_policy::Enforcer;

use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct Summary {
    policy_path: String,
    request: String,
    policy: String,
    role_definitions: Vec<String>,
    effect: String,
    policies: usize,
    grouping_rules: usize,
}

/// Reports what the loaded files contain. Loading already rejected any
/// malformed model or policy line.
pub fn execute(enforcer: &Enforcer, format: OutputFormat) -> bool {
    let model = enforcer.model();
    let summary = Summary {
        policy_path: enforcer.policy_path().display().to_string(),
        request: model.request_shape().attributes.join(", "),
        policy: model.policy_shape().attributes.join(", "),
        role_definitions: model
            .role_definitions()
            .iter()
            .map(|d| d.name.clone())
            .collect(),
        effect: format!("{:?}", model.effect()),
        policies: enforcer.policies().len(),
        grouping_rules: enforcer.grouping_rules().len(),
    };

    match format {
        OutputFormat::Json => output::print_item(&summary, "", format),
        OutputFormat::Table => {
            output::print_success(&format!("Policy '{}' is valid", summary.policy_path));
            output::print_kv("Request", &summary.request);
            output::print_kv("Policy", &summary.policy);
            output::print_kv("Roles", &summary.role_definitions.join(", "));
            output::print_kv("Effect", &summary.effect);
            output::print_kv("Policy rules", &summary.policies.to_string());
            output::print_kv("Grouping rules", &summary.grouping_rules.to_string());
        }
    }
    true
}
