//! Policy enforcer: evaluates requests and owns the mutable policy store.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex;
use tracing::{debug, error, info};
use warden_core::{AppError, AppResult};

use crate::model::PolicyModel;
use crate::store::{GroupingRule, PolicyRule, PolicyStore, validate_value};

/// Evaluates `(subject, object, action)` requests against the model and
/// the current policy store.
///
/// Reads and mutations are synchronous and serialized by an internal
/// reader/writer lock, so `Enforce` always observes a fully applied
/// mutation. Persistence is explicit via [`Enforcer::save_policy`].
#[derive(Debug)]
pub struct Enforcer {
    model: PolicyModel,
    store: RwLock<PolicyStore>,
    policy_path: PathBuf,
    flush_lock: Mutex<()>,
}

impl Enforcer {
    /// Create an enforcer over an already loaded model and store.
    pub fn new(model: PolicyModel, store: PolicyStore, policy_path: impl Into<PathBuf>) -> Self {
        Self {
            model,
            store: RwLock::new(store),
            policy_path: policy_path.into(),
            flush_lock: Mutex::new(()),
        }
    }

    /// Load the model and policy files. Either failing is fatal.
    pub async fn from_files(
        model_path: impl AsRef<Path>,
        policy_path: impl AsRef<Path>,
    ) -> AppResult<Self> {
        let model = PolicyModel::load(model_path).await?;
        let policy_path = policy_path.as_ref();
        let store = PolicyStore::load(policy_path, &model).await?;
        Ok(Self::new(model, store, policy_path))
    }

    pub fn model(&self) -> &PolicyModel {
        &self.model
    }

    pub fn policy_path(&self) -> &Path {
        &self.policy_path
    }

    /// Decide whether `subject` may perform `action` on `object`.
    ///
    /// Never errors: anything that cannot be evaluated is denied.
    pub fn enforce(&self, subject: &str, object: &str, action: &str) -> bool {
        self.enforce_request(&[subject, object, action])
    }

    /// Decide a request given as a tuple in request-shape order.
    pub fn enforce_request(&self, request: &[&str]) -> bool {
        let arity = self.model.request_shape().len();
        if request.len() != arity || request.iter().any(|v| v.is_empty()) {
            debug!(
                request = ?request,
                expected = arity,
                "Malformed request denied"
            );
            return false;
        }

        let store = self.read_store();
        let has_role = |definition: &str, subject: &str, role: &str| {
            store
                .role_graph(definition)
                .is_some_and(|g| g.has_role(subject, role))
        };
        let matcher = self.model.matcher();
        let matched = store
            .policies()
            .filter(|rule| matcher.eval(request, rule.values(), &has_role))
            .map(|rule| self.model.rule_effect(rule));
        let allowed = self.model.effect().decide(matched);

        debug!(request = ?request, allowed, "Policy decision");
        allowed
    }

    /// Reflexive-transitive role membership through the primary role relation.
    pub fn has_role(&self, subject: &str, role: &str) -> bool {
        let Some(definition) = self.model.primary_role_definition() else {
            return false;
        };
        self.read_store()
            .role_graph(definition)
            .is_some_and(|g| g.has_role(subject, role))
    }

    /// Assign `role` to `user`. Returns `false` if already assigned.
    pub fn add_role_for_user(&self, user: &str, role: &str) -> AppResult<bool> {
        validate_value("user", user)?;
        validate_value("role", role)?;
        let definition = self.role_definition()?;

        let added = self.write_store().add_grouping(definition, user, role);
        if added {
            info!(user = %user, role = %role, "Role assigned");
        }
        Ok(added)
    }

    /// Revoke `role` from `user`. Returns `false` if it was not assigned.
    pub fn remove_role_for_user(&self, user: &str, role: &str) -> bool {
        let Some(definition) = self.model.primary_role_definition() else {
            return false;
        };
        let removed = self.write_store().remove_grouping(definition, user, role);
        if removed {
            info!(user = %user, role = %role, "Role revoked");
        }
        removed
    }

    /// Revoke every role held directly by `user`, returning what was revoked.
    pub fn delete_roles_for_user(&self, user: &str) -> Vec<String> {
        let Some(definition) = self.model.primary_role_definition() else {
            return Vec::new();
        };
        let revoked = self.write_store().remove_subject(definition, user);
        if !revoked.is_empty() {
            info!(user = %user, roles = ?revoked, "All roles revoked");
        }
        revoked
    }

    /// Whether `name` is used as a role: it has members in the primary role
    /// relation or is the subject of a policy rule.
    pub fn is_role_name(&self, name: &str) -> bool {
        let store = self.read_store();
        let has_members = self
            .model
            .primary_role_definition()
            .and_then(|definition| store.role_graph(definition))
            .is_some_and(|g| g.has_members(name));
        has_members || store.policies().any(|rule| rule.subject() == name)
    }

    /// Roles assigned directly to `user`, sorted.
    pub fn roles_for_user(&self, user: &str) -> Vec<String> {
        self.with_primary_graph(|g| g.direct_roles(user))
    }

    /// Roles reachable from `user` through any chain of assignments, sorted.
    pub fn implicit_roles_for_user(&self, user: &str) -> Vec<String> {
        self.with_primary_graph(|g| g.reachable_roles(user))
    }

    /// Subjects assigned `role` directly, sorted.
    pub fn users_for_role(&self, role: &str) -> Vec<String> {
        self.with_primary_graph(|g| g.direct_members(role))
    }

    /// Grant `action` on `object` to `role`. Returns `false` if already granted.
    pub fn add_policy(&self, role: &str, object: &str, action: &str) -> AppResult<bool> {
        let rule = self.policy_rule(role, object, action)?;
        let added = self.write_store().add_policy(rule);
        if added {
            info!(role = %role, object = %object, action = %action, "Policy added");
        }
        Ok(added)
    }

    /// Add a full policy tuple, including an explicit effect where the
    /// model declares one.
    pub fn add_policy_values(&self, values: Vec<String>) -> AppResult<bool> {
        for value in &values {
            validate_value("policy value", value)?;
        }
        let rule = self.model.complete_policy(values)?;
        let added = self.write_store().add_policy(rule.clone());
        if added {
            info!(rule = %rule, "Policy added");
        }
        Ok(added)
    }

    /// Withdraw a grant. Returns `false` if it did not exist.
    pub fn remove_policy(&self, role: &str, object: &str, action: &str) -> bool {
        let Ok(rule) = self.policy_rule(role, object, action) else {
            return false;
        };
        let removed = self.write_store().remove_policy(&rule);
        if removed {
            info!(role = %role, object = %object, action = %action, "Policy removed");
        }
        removed
    }

    /// Withdraw a full policy tuple, including an explicit effect where the
    /// model declares one. Returns `false` if it did not exist.
    pub fn remove_policy_values(&self, values: Vec<String>) -> AppResult<bool> {
        for value in &values {
            validate_value("policy value", value)?;
        }
        let rule = self.model.complete_policy(values)?;
        let removed = self.write_store().remove_policy(&rule);
        if removed {
            info!(rule = %rule, "Policy removed");
        }
        Ok(removed)
    }

    pub fn has_policy(&self, role: &str, object: &str, action: &str) -> bool {
        self.policy_rule(role, object, action)
            .is_ok_and(|rule| self.read_store().has_policy(&rule))
    }

    /// Every policy rule, sorted.
    pub fn policies(&self) -> Vec<PolicyRule> {
        self.read_store().policies().cloned().collect()
    }

    /// Every grouping edge of the primary role relation, sorted.
    pub fn grouping_rules(&self) -> Vec<GroupingRule> {
        self.with_primary_graph(|g| g.rules().collect())
    }

    /// Policy rules whose subject is `user` itself.
    pub fn permissions_for_user(&self, user: &str) -> Vec<PolicyRule> {
        self.read_store()
            .policies()
            .filter(|rule| rule.subject() == user)
            .cloned()
            .collect()
    }

    /// Policy rules granted to `user` or any role it reaches.
    pub fn implicit_permissions_for_user(&self, user: &str) -> Vec<PolicyRule> {
        let mut subjects = self.implicit_roles_for_user(user);
        subjects.push(user.to_string());
        self.read_store()
            .policies()
            .filter(|rule| subjects.iter().any(|s| s == rule.subject()))
            .cloned()
            .collect()
    }

    /// Flush the current store to the policy file.
    ///
    /// Saves are serialized; each writes a consistent snapshot taken under
    /// the read lock, then replaces the file atomically.
    pub async fn save_policy(&self) -> AppResult<()> {
        let _guard = self.flush_lock.lock().await;
        let snapshot = self.read_store().clone();
        match snapshot.flush(&self.policy_path, &self.model).await {
            Ok(()) => {
                info!(
                    path = %self.policy_path.display(),
                    policies = snapshot.policy_count(),
                    groupings = snapshot.grouping_count(),
                    "Policy saved"
                );
                Ok(())
            }
            Err(e) => {
                error!(path = %self.policy_path.display(), error = %e, "Failed to save policy");
                Err(e)
            }
        }
    }

    fn policy_rule(&self, role: &str, object: &str, action: &str) -> AppResult<PolicyRule> {
        validate_value("role", role)?;
        validate_value("object", object)?;
        validate_value("action", action)?;
        self.model
            .complete_policy(vec![role.to_string(), object.to_string(), action.to_string()])
    }

    fn role_definition(&self) -> AppResult<&str> {
        self.model
            .primary_role_definition()
            .ok_or_else(|| AppError::configuration("Policy model declares no role definition"))
    }

    fn with_primary_graph<T: Default>(&self, f: impl FnOnce(&crate::store::RoleGraph) -> T) -> T {
        let Some(definition) = self.model.primary_role_definition() else {
            return T::default();
        };
        self.read_store()
            .role_graph(definition)
            .map(f)
            .unwrap_or_default()
    }

    fn read_store(&self) -> RwLockReadGuard<'_, PolicyStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, PolicyStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use warden_core::ErrorKind;

    const POLICY: &str = "\
p, admin, /users, GET
p, admin, /users, POST
p, admin, /users, DELETE
p, manager, /users, GET
p, user, /users/me, GET
g, admin_user, admin
g, manager_user, manager
g, regular_user, user
";

    fn enforcer_from(policy: &str) -> Enforcer {
        let model = PolicyModel::default_rbac().unwrap();
        let store = PolicyStore::parse(policy, &model).unwrap();
        Enforcer::new(model, store, "unused.csv")
    }

    #[test]
    fn test_scenario_decisions() {
        let e = enforcer_from(POLICY);
        assert!(e.enforce("admin_user", "/users", "GET"));
        assert!(e.enforce("manager_user", "/users", "GET"));
        assert!(!e.enforce("manager_user", "/users", "DELETE"));
        assert!(!e.enforce("regular_user", "/users", "GET"));
        assert!(e.enforce("regular_user", "/users/me", "GET"));
    }

    #[test]
    fn test_default_deny_for_unknown_subject() {
        let e = enforcer_from(POLICY);
        assert!(!e.enforce("ghost", "/users", "GET"));
        assert!(!e.enforce("admin", "/nowhere", "GET"));
        assert!(!e.enforce("", "/users", "GET"));
        assert!(!e.enforce_request(&["admin_user", "/users"]));
    }

    #[test]
    fn test_role_removal_revokes_access() {
        let e = enforcer_from(POLICY);
        assert!(e.enforce("admin_user", "/users", "DELETE"));
        assert!(e.remove_role_for_user("admin_user", "admin"));
        assert!(!e.enforce("admin_user", "/users", "DELETE"));
        assert!(!e.remove_role_for_user("admin_user", "admin"));
    }

    #[test]
    fn test_role_inheritance_is_transitive() {
        let e = enforcer_from(POLICY);
        e.add_role_for_user("admin", "manager").unwrap();
        e.add_role_for_user("manager", "user").unwrap();

        assert!(e.has_role("admin_user", "user"));
        assert!(e.enforce("admin_user", "/users/me", "GET"));
        assert_eq!(
            e.implicit_roles_for_user("admin_user"),
            ["admin", "manager", "user"]
        );
    }

    #[test]
    fn test_grouping_cycle_terminates() {
        let e = enforcer_from("p, a, /x, GET\ng, a, b\ng, b, a\ng, u, a\n");
        assert!(e.enforce("u", "/x", "GET"));
        assert!(!e.enforce("u", "/y", "GET"));
        assert!(!e.has_role("u", "z"));
    }

    #[test]
    fn test_add_policy_is_idempotent() {
        let e = enforcer_from(POLICY);
        assert!(e.add_policy("user", "/resources", "GET").unwrap());
        assert!(!e.add_policy("user", "/resources", "GET").unwrap());
        assert_eq!(e.policies().len(), 6);
        assert!(e.has_policy("user", "/resources", "GET"));
        assert!(e.enforce("regular_user", "/resources", "GET"));

        assert!(e.remove_policy("user", "/resources", "GET"));
        assert!(!e.enforce("regular_user", "/resources", "GET"));
    }

    #[test]
    fn test_role_names() {
        let e = enforcer_from(POLICY);
        assert!(e.is_role_name("admin"));
        assert!(e.is_role_name("user"));
        assert!(!e.is_role_name("admin_user"));
        assert!(!e.is_role_name("ghost"));

        e.add_role_for_user("auditor", "user").unwrap();
        e.add_role_for_user("dana", "auditor").unwrap();
        assert!(e.is_role_name("auditor"));
    }

    #[test]
    fn test_mutations_validate_values() {
        let e = enforcer_from(POLICY);
        let err = e.add_role_for_user("", "admin").unwrap_err();
        assert!(err.is(ErrorKind::Validation));
        let err = e.add_policy("admin", "/a,b", "GET").unwrap_err();
        assert!(err.is(ErrorKind::Validation));
        assert_eq!(e.policies().len(), 5);
    }

    #[test]
    fn test_queries() {
        let e = enforcer_from(POLICY);
        e.add_role_for_user("admin_user", "manager").unwrap();

        assert_eq!(e.roles_for_user("admin_user"), ["admin", "manager"]);
        assert_eq!(e.users_for_role("manager"), ["admin_user", "manager_user"]);
        assert!(e.permissions_for_user("admin_user").is_empty());
        assert_eq!(e.permissions_for_user("admin").len(), 3);
        assert_eq!(e.implicit_permissions_for_user("admin_user").len(), 4);
        assert_eq!(e.grouping_rules().len(), 4);

        assert_eq!(e.delete_roles_for_user("admin_user"), ["admin", "manager"]);
        assert!(e.roles_for_user("admin_user").is_empty());
    }

    #[test]
    fn test_explicit_deny_rule() {
        let model: PolicyModel = "\
[request_definition]
r = sub, obj, act
[policy_definition]
p = sub, obj, act, eft
[role_definition]
g = _, _
[policy_effect]
e = some(where (p.eft == allow)) && !some(where (p.eft == deny))
[matchers]
m = g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act
"
        .parse()
        .unwrap();
        let store = PolicyStore::parse(
            "p, staff, /reports, GET\np, intern, /reports, GET, deny\ng, ann, staff\ng, ann, intern\ng, bo, staff\n",
            &model,
        )
        .unwrap();
        let e = Enforcer::new(model, store, "unused.csv");

        assert!(e.enforce("bo", "/reports", "GET"));
        assert!(!e.enforce("ann", "/reports", "GET"));
        assert!(e.add_policy("staff", "/wiki", "GET").unwrap());
        assert!(e.enforce("ann", "/wiki", "GET"));

        assert!(!e.remove_policy("intern", "/reports", "GET"));
        let values = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert!(
            e.remove_policy_values(values(&["intern", "/reports", "GET", "deny"]))
                .unwrap()
        );
        assert!(e.enforce("ann", "/reports", "GET"));
        assert!(
            !e.remove_policy_values(values(&["intern", "/reports", "GET", "deny"]))
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_save_and_reload_preserves_decisions() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("rbac_model.conf");
        let policy_path = dir.path().join("policy.csv");
        tokio::fs::write(&model_path, crate::model::DEFAULT_MODEL)
            .await
            .unwrap();
        tokio::fs::write(&policy_path, POLICY).await.unwrap();

        let e = Enforcer::from_files(&model_path, &policy_path).await.unwrap();
        e.add_role_for_user("carol", "manager").unwrap();
        e.remove_role_for_user("admin_user", "admin");
        e.add_policy("manager", "/resources", "POST").unwrap();
        e.save_policy().await.unwrap();

        let reloaded = Enforcer::from_files(&model_path, &policy_path).await.unwrap();
        let requests = [
            ("carol", "/users", "GET"),
            ("carol", "/resources", "POST"),
            ("admin_user", "/users", "DELETE"),
            ("manager_user", "/users", "GET"),
            ("regular_user", "/users/me", "GET"),
        ];
        for (s, o, a) in requests {
            assert_eq!(e.enforce(s, o, a), reloaded.enforce(s, o, a), "{s} {o} {a}");
        }
        assert_eq!(e.policies(), reloaded.policies());
        assert_eq!(e.grouping_rules(), reloaded.grouping_rules());
    }

    #[tokio::test]
    async fn test_missing_policy_file_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("rbac_model.conf");
        tokio::fs::write(&model_path, crate::model::DEFAULT_MODEL)
            .await
            .unwrap();

        let err = Enforcer::from_files(&model_path, dir.path().join("policy.csv"))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Configuration));
    }

    #[tokio::test]
    async fn test_save_failure_keeps_memory_state() {
        let model = PolicyModel::default_rbac().unwrap();
        let store = PolicyStore::parse(POLICY, &model).unwrap();
        let e = Enforcer::new(model, store, "/nonexistent/dir/policy.csv");

        e.add_role_for_user("carol", "admin").unwrap();
        let err = e.save_policy().await.unwrap_err();
        assert!(err.is(ErrorKind::Persistence));
        assert!(e.enforce("carol", "/users", "GET"));
    }

    #[test]
    fn test_concurrent_enforce_sees_whole_mutations() {
        let e = Arc::new(enforcer_from(POLICY));

        std::thread::scope(|scope| {
            let writer = Arc::clone(&e);
            scope.spawn(move || {
                for _ in 0..200 {
                    writer.add_role_for_user("temp", "admin").unwrap();
                    writer.remove_role_for_user("temp", "admin");
                }
            });

            for _ in 0..4 {
                let reader = Arc::clone(&e);
                scope.spawn(move || {
                    for _ in 0..200 {
                        assert!(reader.enforce("admin_user", "/users", "GET"));
                        assert!(!reader.enforce("regular_user", "/users", "DELETE"));
                        let _ = reader.enforce("temp", "/users", "GET");
                    }
                });
            }
        });

        assert!(!e.enforce("temp", "/users", "GET"));
    }

    #[tokio::test]
    async fn test_concurrent_saves_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.csv");
        let model = PolicyModel::default_rbac().unwrap();
        let store = PolicyStore::parse(POLICY, &model).unwrap();
        let e = Arc::new(Enforcer::new(model, store, &path));

        let mut handles = Vec::new();
        for i in 0..8 {
            let e = Arc::clone(&e);
            handles.push(tokio::spawn(async move {
                e.add_role_for_user(&format!("user{i}"), "user").unwrap();
                e.save_policy().await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let reloaded = PolicyStore::parse(&text, e.model()).unwrap();
        assert_eq!(reloaded.grouping_count(), 11);
    }
}
