//! Policy engine and authorization gate configuration.

use serde::{Deserialize, Serialize};

/// Which authorization gate guards the API.
///
/// The two gates use different `(object, action)` vocabularies, so exactly
/// one is active per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Each route declares its own `(resource, action)` pair.
    #[default]
    PerRoute,
    /// Every request is checked against `(path, method)` before routing.
    Global,
}

/// RBAC configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbacConfig {
    /// Path to the policy model file.
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// Path to the policy store file.
    #[serde(default = "default_policy_path")]
    pub policy_path: String,
    /// Active authorization gate.
    #[serde(default)]
    pub gate_mode: GateMode,
    /// Path prefixes the global gate lets through without a check.
    /// A bare `/` only matches the root path exactly.
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
    /// Have the global gate check paths relative to `server.api_prefix`
    /// instead of the raw request path.
    #[serde(default)]
    pub strip_api_prefix: bool,
    /// Seed the demo users on startup when the user store is empty.
    #[serde(default)]
    pub seed_demo_users: bool,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            policy_path: default_policy_path(),
            gate_mode: GateMode::default(),
            public_paths: default_public_paths(),
            strip_api_prefix: false,
            seed_demo_users: false,
        }
    }
}

impl RbacConfig {
    /// Returns `true` if the global gate should skip the given request path.
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|public| {
            if public == "/" {
                path == "/"
            } else {
                path == public
                    || path
                        .strip_prefix(public.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        })
    }
}

fn default_model_path() -> String {
    "config/rbac_model.conf".to_string()
}

fn default_policy_path() -> String {
    "config/policy.csv".to_string()
}

fn default_public_paths() -> Vec<String> {
    vec!["/".to_string(), "/api/auth".to_string(), "/health".to_string()]
}
