//! In-memory policy store and its line-oriented file format.
//!
//! Each non-empty line is a comma-separated tuple whose first field is the
//! tag: the policy key (`p`) or a role definition name (`g`).
//!
//! ```text
//! p, admin, /users, GET
//! g, alice, admin
//! ```

pub mod role_graph;
pub mod rule;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

use tracing::{debug, info};
use warden_core::{AppError, AppResult, ErrorKind};

use crate::model::PolicyModel;

pub use role_graph::RoleGraph;
pub use rule::{GroupingRule, PolicyRule, validate_value};

/// Policy rules plus one role graph per declared role definition.
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    policies: BTreeSet<PolicyRule>,
    groupings: BTreeMap<String, RoleGraph>,
}

impl PolicyStore {
    /// An empty store with a graph for each of the model's role definitions.
    pub fn empty(model: &PolicyModel) -> Self {
        let groupings = model
            .role_definitions()
            .iter()
            .map(|def| (def.name.clone(), RoleGraph::new()))
            .collect();
        Self {
            policies: BTreeSet::new(),
            groupings,
        }
    }

    /// Load a policy file.
    ///
    /// A missing file is a `Configuration` error: an empty policy must be an
    /// explicit empty file.
    pub async fn load(path: impl AsRef<Path>, model: &PolicyModel) -> AppResult<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Cannot read policy file '{}'", path.display()),
                e,
            )
        })?;
        let store = Self::parse(&text, model)?;
        info!(
            path = %path.display(),
            policies = store.policies.len(),
            groupings = store.grouping_count(),
            "Policy store loaded"
        );
        Ok(store)
    }

    /// Parse policy file text against a model.
    pub fn parse(text: &str, model: &PolicyModel) -> AppResult<Self> {
        let mut store = Self::empty(model);
        let policy_key = model.policy_shape().key.as_str();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split(',').map(str::trim);
            let tag = fields.next().unwrap_or_default();
            let values: Vec<String> = fields.map(str::to_string).collect();
            if values.iter().any(String::is_empty) {
                return Err(line_error(line_no, "empty field"));
            }

            if tag == policy_key {
                let rule = model
                    .complete_policy(values)
                    .map_err(|e| line_error(line_no, &e.message))?;
                store.policies.insert(rule);
            } else if model.is_role_definition(tag) {
                let [subject, role] = values.as_slice() else {
                    return Err(line_error(
                        line_no,
                        &format!("grouping rule needs 2 values, found {}", values.len()),
                    ));
                };
                store.graph_mut(tag).add(subject, role);
            } else {
                return Err(line_error(line_no, &format!("unknown rule tag '{tag}'")));
            }
        }

        Ok(store)
    }

    /// Serialize the store: policy lines first, then grouping lines, each
    /// in sorted order.
    pub fn serialize(&self, model: &PolicyModel) -> String {
        let mut out = String::new();
        let policy_key = &model.policy_shape().key;

        for rule in &self.policies {
            let _ = writeln!(out, "{policy_key}, {rule}");
        }
        for (tag, graph) in &self.groupings {
            for rule in graph.rules() {
                let _ = writeln!(out, "{tag}, {}, {}", rule.subject, rule.role);
            }
        }
        out
    }

    /// Write the serialized store to `path` atomically.
    pub async fn flush(&self, path: impl AsRef<Path>, model: &PolicyModel) -> AppResult<()> {
        write_atomic(path.as_ref(), &self.serialize(model)).await
    }

    pub fn add_policy(&mut self, rule: PolicyRule) -> bool {
        self.policies.insert(rule)
    }

    pub fn remove_policy(&mut self, rule: &PolicyRule) -> bool {
        self.policies.remove(rule)
    }

    pub fn has_policy(&self, rule: &PolicyRule) -> bool {
        self.policies.contains(rule)
    }

    /// Policy rules in sorted order.
    pub fn policies(&self) -> impl Iterator<Item = &PolicyRule> {
        self.policies.iter()
    }

    pub fn add_grouping(&mut self, definition: &str, subject: &str, role: &str) -> bool {
        self.graph_mut(definition).add(subject, role)
    }

    pub fn remove_grouping(&mut self, definition: &str, subject: &str, role: &str) -> bool {
        self.groupings
            .get_mut(definition)
            .is_some_and(|g| g.remove(subject, role))
    }

    /// The role graph for a definition, if any grouping was ever declared.
    pub fn role_graph(&self, definition: &str) -> Option<&RoleGraph> {
        self.groupings.get(definition)
    }

    /// Drop every role held directly by `subject`, returning them.
    pub fn remove_subject(&mut self, definition: &str, subject: &str) -> Vec<String> {
        self.groupings
            .get_mut(definition)
            .map(|g| g.remove_subject(subject))
            .unwrap_or_default()
    }

    /// Total grouping edges across all role definitions.
    pub fn grouping_count(&self) -> usize {
        self.groupings.values().map(RoleGraph::len).sum()
    }

    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }

    fn graph_mut(&mut self, definition: &str) -> &mut RoleGraph {
        self.groupings.entry(definition.to_string()).or_default()
    }
}

fn line_error(line_no: usize, reason: &str) -> AppError {
    AppError::configuration(format!("Policy file line {line_no}: {reason}"))
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
async fn write_atomic(path: &Path, contents: &str) -> AppResult<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::persistence(format!("Invalid policy path '{}'", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    tokio::fs::write(&tmp, contents).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Persistence,
            format!("Failed to write '{}'", tmp.display()),
            e,
        )
    })?;

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(AppError::with_source(
            ErrorKind::Persistence,
            format!("Failed to replace '{}'", path.display()),
            e,
        ));
    }

    debug!(path = %path.display(), bytes = contents.len(), "Policy file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = "\
# roles
p, admin, /users, GET
p, user, /resources, GET

g, alice, admin
g, admin, user
";

    fn model() -> PolicyModel {
        PolicyModel::default_rbac().unwrap()
    }

    #[test]
    fn test_parse_policy_file() {
        let store = PolicyStore::parse(POLICY, &model()).unwrap();
        assert_eq!(store.policy_count(), 2);
        assert_eq!(store.grouping_count(), 2);
        let graph = store.role_graph("g").unwrap();
        assert!(graph.has_role("alice", "user"));
    }

    #[test]
    fn test_parse_reports_line_numbers() {
        let m = model();
        let err = PolicyStore::parse("p, admin, /a, GET\nq, x, y\n", &m).unwrap_err();
        assert!(err.is(ErrorKind::Configuration));
        assert!(err.message.contains("line 2"));

        let err = PolicyStore::parse("g, alice\n", &m).unwrap_err();
        assert!(err.message.contains("line 1"));

        let err = PolicyStore::parse("p, admin, , GET\n", &m).unwrap_err();
        assert!(err.message.contains("empty field"));

        let err = PolicyStore::parse("p, admin, /a\n", &m).unwrap_err();
        assert!(err.is(ErrorKind::Configuration));
    }

    #[test]
    fn test_serialize_round_trips() {
        let m = model();
        let store = PolicyStore::parse(POLICY, &m).unwrap();
        let text = store.serialize(&m);
        assert_eq!(
            text,
            "p, admin, /users, GET\np, user, /resources, GET\ng, admin, user\ng, alice, admin\n"
        );
        let reparsed = PolicyStore::parse(&text, &m).unwrap();
        assert_eq!(reparsed.serialize(&m), text);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PolicyStore::load(dir.path().join("policy.csv"), &model())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Configuration));
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.csv");
        tokio::fs::write(&path, "").await.unwrap();
        let store = PolicyStore::load(&path, &model()).await.unwrap();
        assert_eq!(store.policy_count(), 0);
        assert_eq!(store.grouping_count(), 0);
    }

    #[tokio::test]
    async fn test_flush_replaces_file() {
        let m = model();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.csv");
        tokio::fs::write(&path, POLICY).await.unwrap();

        let mut store = PolicyStore::load(&path, &m).await.unwrap();
        store.add_grouping("g", "bob", "user");
        store.flush(&path, &m).await.unwrap();

        let reloaded = PolicyStore::load(&path, &m).await.unwrap();
        assert!(reloaded.role_graph("g").unwrap().contains("bob", "user"));
        assert!(!dir.path().join(".policy.csv.tmp").exists());
    }

    #[tokio::test]
    async fn test_flush_to_missing_directory_is_persistence_error() {
        let m = model();
        let store = PolicyStore::empty(&m);
        let err = store
            .flush("/nonexistent/dir/policy.csv", &m)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Persistence));
    }
}
