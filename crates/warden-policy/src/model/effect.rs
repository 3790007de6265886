//! Effect combination over matched policy rules.

use std::fmt;

use serde::{Deserialize, Serialize};
use warden_core::{AppError, AppResult};

/// The outcome a single policy rule contributes when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleEffect {
    /// The rule grants the request.
    Allow,
    /// The rule explicitly denies the request.
    Deny,
}

impl RuleEffect {
    /// Parse the value of a policy's `eft` attribute.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(AppError::validation(format!(
                "Invalid rule effect '{other}', expected 'allow' or 'deny'"
            ))),
        }
    }

    /// The textual form stored in the policy file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for RuleEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ALLOW_OVERRIDE: &str = "some(where(p.eft==allow))";
const ALLOW_AND_DENY: &str = "some(where(p.eft==allow))&&!some(where(p.eft==deny))";
const DENY_OVERRIDE: &str = "!some(where(p.eft==deny))";

/// Rule combining the outcomes of all matched policy rules into one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    /// Allowed iff at least one matched rule allows.
    #[default]
    AllowOverride,
    /// Allowed iff at least one matched rule allows and none denies.
    AllowAndDeny,
}

impl Effect {
    /// Parse a `[policy_effect]` expression.
    pub fn parse(expression: &str) -> AppResult<Self> {
        let normalized: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
        match normalized.as_str() {
            ALLOW_OVERRIDE => Ok(Self::AllowOverride),
            ALLOW_AND_DENY => Ok(Self::AllowAndDeny),
            DENY_OVERRIDE => Err(AppError::configuration(
                "Deny-override effect is not supported: it allows requests no rule matches",
            )),
            _ => Err(AppError::configuration(format!(
                "Unsupported policy effect '{expression}'"
            ))),
        }
    }

    /// Combine matched rule effects into an allow/deny decision.
    ///
    /// The iterator is consumed lazily, so callers may pass a filtered view
    /// over the store and stop evaluating once the decision is settled.
    pub fn decide<I>(&self, matched: I) -> bool
    where
        I: IntoIterator<Item = RuleEffect>,
    {
        match self {
            Self::AllowOverride => matched.into_iter().any(|e| e == RuleEffect::Allow),
            Self::AllowAndDeny => {
                let mut allowed = false;
                for effect in matched {
                    match effect {
                        RuleEffect::Deny => return false,
                        RuleEffect::Allow => allowed = true,
                    }
                }
                allowed
            }
        }
    }
}
