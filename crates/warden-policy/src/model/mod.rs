//! Declarative policy model.
//!
//! A model file is INI-like: `[section]` headers followed by `key = value`
//! lines. `#` starts a comment line.

pub mod effect;
pub mod matcher;

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use tracing::info;
use warden_core::{AppError, AppResult};

pub use effect::{Effect, RuleEffect};
pub use matcher::Matcher;

use crate::store::PolicyRule;

/// The classic RBAC model used when no model file is configured.
pub const DEFAULT_MODEL: &str = include_str!("rbac_model.conf");

/// Name of the optional policy attribute carrying a rule's effect.
const EFFECT_ATTRIBUTE: &str = "eft";

/// Ordered attribute names of a request or policy tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeShape {
    /// Definition key, `r` or `p` in the conventional model.
    pub key: String,
    /// Attribute names in tuple order.
    pub attributes: Vec<String>,
}

impl AttributeShape {
    /// Build a shape from a key and attribute names.
    pub fn new<I, S>(key: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    /// Position of an attribute in the tuple.
    pub fn index_of(&self, attribute: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a == attribute)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the shape has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// A declared two-argument role relation such as `g = _, _`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    pub name: String,
}

impl RoleDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Immutable policy model, loaded once at startup.
#[derive(Debug, Clone)]
pub struct PolicyModel {
    request: AttributeShape,
    policy: AttributeShape,
    role_definitions: Vec<RoleDefinition>,
    effect: Effect,
    matcher: Matcher,
}

impl PolicyModel {
    /// Load a model file from disk.
    ///
    /// A missing or malformed file is a `Configuration` error.
    pub async fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::with_source(
                warden_core::ErrorKind::Configuration,
                format!("Cannot read policy model '{}'", path.display()),
                e,
            )
        })?;
        let model: Self = text.parse()?;
        info!(
            path = %path.display(),
            request = ?model.request.attributes,
            policy = ?model.policy.attributes,
            matcher = model.matcher.as_str(),
            "Policy model loaded"
        );
        Ok(model)
    }

    /// The embedded classic RBAC model.
    pub fn default_rbac() -> AppResult<Self> {
        DEFAULT_MODEL.parse()
    }

    /// Request tuple shape.
    pub fn request_shape(&self) -> &AttributeShape {
        &self.request
    }

    /// Policy tuple shape.
    pub fn policy_shape(&self) -> &AttributeShape {
        &self.policy
    }

    /// Declared role relations.
    pub fn role_definitions(&self) -> &[RoleDefinition] {
        &self.role_definitions
    }

    /// The first declared role relation, used by the role mutation API.
    pub fn primary_role_definition(&self) -> Option<&str> {
        self.role_definitions.first().map(|d| d.name.as_str())
    }

    /// Whether `tag` names a declared role relation.
    pub fn is_role_definition(&self, tag: &str) -> bool {
        self.role_definitions.iter().any(|d| d.name == tag)
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// The effect a stored rule contributes when it matches.
    ///
    /// Models without an `eft` attribute treat every rule as allow.
    pub fn rule_effect(&self, rule: &PolicyRule) -> RuleEffect {
        match self.policy.index_of(EFFECT_ATTRIBUTE) {
            Some(idx) if rule.get(idx) == Some(RuleEffect::Deny.as_str()) => RuleEffect::Deny,
            _ => RuleEffect::Allow,
        }
    }

    /// Validate a policy tuple against the policy shape.
    ///
    /// When the model declares `eft` as its last attribute, a tuple one
    /// value short is completed with `allow`.
    pub fn complete_policy(&self, mut values: Vec<String>) -> AppResult<PolicyRule> {
        let arity = self.policy.len();
        let eft_index = self.policy.index_of(EFFECT_ATTRIBUTE);

        if values.len() + 1 == arity && eft_index == Some(arity - 1) {
            values.push(RuleEffect::Allow.as_str().to_string());
        }
        if values.len() != arity {
            return Err(AppError::validation(format!(
                "Policy rule has {} values, model expects {} ({})",
                values.len(),
                arity,
                self.policy.attributes.join(", ")
            )));
        }
        if let Some(idx) = eft_index {
            RuleEffect::parse(&values[idx])?;
        }
        Ok(PolicyRule::from_values(values))
    }
}

impl FromStr for PolicyModel {
    type Err = AppError;

    fn from_str(text: &str) -> AppResult<Self> {
        let sections = parse_sections(text)?;

        let mut request = None;
        let mut policy = None;
        let mut role_definitions = Vec::new();
        let mut effect = None;
        let mut matcher_source = None;

        for section in &sections {
            match section.name.as_str() {
                "request_definition" => {
                    let (key, value) = section.single()?;
                    request = Some(parse_shape(key, value)?);
                }
                "policy_definition" => {
                    let (key, value) = section.single()?;
                    policy = Some(parse_shape(key, value)?);
                }
                "role_definition" => {
                    for (key, value, line) in &section.entries {
                        let arity: String = value.chars().filter(|c| !c.is_whitespace()).collect();
                        if arity != "_,_" {
                            return Err(AppError::configuration(format!(
                                "Line {line}: role definition '{key}' must be '_, _'"
                            )));
                        }
                        role_definitions.push(RoleDefinition::new(key.clone()));
                    }
                }
                "policy_effect" => {
                    let (_, value) = section.single()?;
                    effect = Some(Effect::parse(value)?);
                }
                "matchers" => {
                    let (_, value) = section.single()?;
                    matcher_source = Some(value.clone());
                }
                other => {
                    return Err(AppError::configuration(format!(
                        "Unknown model section '[{other}]'"
                    )));
                }
            }
        }

        let missing = |name: &str| AppError::configuration(format!("Model is missing [{name}]"));
        let request = request.ok_or_else(|| missing("request_definition"))?;
        let policy = policy.ok_or_else(|| missing("policy_definition"))?;
        let effect = effect.ok_or_else(|| missing("policy_effect"))?;
        let matcher_source = matcher_source.ok_or_else(|| missing("matchers"))?;

        let mut keys = HashSet::new();
        for key in [&request.key, &policy.key]
            .into_iter()
            .chain(role_definitions.iter().map(|d| &d.name))
        {
            if !keys.insert(key.as_str()) {
                return Err(AppError::configuration(format!(
                    "Model key '{key}' is declared more than once"
                )));
            }
        }

        let matcher = Matcher::parse(&matcher_source, &request, &policy, &role_definitions)?;

        Ok(Self {
            request,
            policy,
            role_definitions,
            effect,
            matcher,
        })
    }
}

struct Section {
    name: String,
    entries: Vec<(String, String, usize)>,
}

impl Section {
    fn single(&self) -> AppResult<(&String, &String)> {
        match self.entries.as_slice() {
            [(key, value, _)] => Ok((key, value)),
            [] => Err(AppError::configuration(format!(
                "Section [{}] is empty",
                self.name
            ))),
            _ => Err(AppError::configuration(format!(
                "Section [{}] must contain exactly one entry",
                self.name
            ))),
        }
    }
}

fn parse_sections(text: &str) -> AppResult<Vec<Section>> {
    let mut sections: Vec<Section> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim();
            if sections.iter().any(|s| s.name == name) {
                return Err(AppError::configuration(format!(
                    "Line {line_no}: duplicate section [{name}]"
                )));
            }
            sections.push(Section {
                name: name.to_string(),
                entries: Vec::new(),
            });
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| {
            AppError::configuration(format!("Line {line_no}: expected 'key = value'"))
        })?;
        let section = sections.last_mut().ok_or_else(|| {
            AppError::configuration(format!("Line {line_no}: entry outside of any section"))
        })?;
        let key = key.trim();
        if !is_identifier(key) {
            return Err(AppError::configuration(format!(
                "Line {line_no}: invalid key '{key}'"
            )));
        }
        section
            .entries
            .push((key.to_string(), value.trim().to_string(), line_no));
    }

    Ok(sections)
}

fn parse_shape(key: &str, value: &str) -> AppResult<AttributeShape> {
    let attributes: Vec<&str> = value.split(',').map(str::trim).collect();
    let mut seen = HashSet::new();
    for attr in &attributes {
        if !is_identifier(attr) {
            return Err(AppError::configuration(format!(
                "Definition '{key}' has invalid attribute '{attr}'"
            )));
        }
        if !seen.insert(*attr) {
            return Err(AppError::configuration(format!(
                "Definition '{key}' repeats attribute '{attr}'"
            )));
        }
    }
    Ok(AttributeShape::new(key, attributes))
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
