//! Directed role graph built from grouping rules.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use super::GroupingRule;

/// Adjacency lists for one role relation.
///
/// `edges` maps a subject to the roles it is directly assigned; `members`
/// is the reverse index.
#[derive(Debug, Clone, Default)]
pub struct RoleGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
    members: BTreeMap<String, BTreeSet<String>>,
}

impl RoleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `subject -> role`. Returns `false` if the edge already existed.
    pub fn add(&mut self, subject: &str, role: &str) -> bool {
        let inserted = self
            .edges
            .entry(subject.to_string())
            .or_default()
            .insert(role.to_string());
        if inserted {
            self.members
                .entry(role.to_string())
                .or_default()
                .insert(subject.to_string());
        }
        inserted
    }

    /// Remove `subject -> role`. Returns `false` if the edge was absent.
    pub fn remove(&mut self, subject: &str, role: &str) -> bool {
        let removed = detach(&mut self.edges, subject, role);
        if removed {
            detach(&mut self.members, role, subject);
        }
        removed
    }

    /// Remove every edge leaving `subject`, returning the roles it held.
    pub fn remove_subject(&mut self, subject: &str) -> Vec<String> {
        let roles = self.edges.remove(subject).unwrap_or_default();
        for role in &roles {
            detach(&mut self.members, role, subject);
        }
        roles.into_iter().collect()
    }

    pub fn contains(&self, subject: &str, role: &str) -> bool {
        self.edges
            .get(subject)
            .is_some_and(|roles| roles.contains(role))
    }

    /// Whether `name` appears on either side of any edge.
    pub fn is_known(&self, name: &str) -> bool {
        self.edges.contains_key(name) || self.members.contains_key(name)
    }

    /// Whether any subject is assigned `role` directly.
    pub fn has_members(&self, role: &str) -> bool {
        self.members.contains_key(role)
    }

    /// Roles assigned directly to `subject`, sorted.
    pub fn direct_roles(&self, subject: &str) -> Vec<String> {
        self.edges
            .get(subject)
            .map(|roles| roles.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Subjects assigned `role` directly, sorted.
    pub fn direct_members(&self, role: &str) -> Vec<String> {
        self.members
            .get(role)
            .map(|subjects| subjects.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Reflexive-transitive reachability from `subject` to `role`.
    ///
    /// Unknown names reach nothing, not even themselves. Cycles terminate
    /// because each node is expanded at most once.
    pub fn has_role(&self, subject: &str, role: &str) -> bool {
        if subject == role {
            return self.is_known(subject);
        }

        let mut visited: HashSet<&str> = HashSet::from([subject]);
        let mut queue: VecDeque<&str> = VecDeque::from([subject]);

        while let Some(current) = queue.pop_front() {
            let Some(next) = self.edges.get(current) else {
                continue;
            };
            for candidate in next {
                if candidate == role {
                    return true;
                }
                if visited.insert(candidate.as_str()) {
                    queue.push_back(candidate.as_str());
                }
            }
        }

        false
    }

    /// Every role reachable from `subject` through one or more edges, sorted.
    pub fn reachable_roles(&self, subject: &str) -> Vec<String> {
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([subject]);

        while let Some(current) = queue.pop_front() {
            if let Some(next) = self.edges.get(current) {
                for candidate in next {
                    if visited.insert(candidate.as_str()) {
                        queue.push_back(candidate.as_str());
                    }
                }
            }
        }

        visited.remove(subject);
        visited.into_iter().map(str::to_string).collect()
    }

    /// All edges as grouping rules, ordered by subject then role.
    pub fn rules(&self) -> impl Iterator<Item = GroupingRule> + '_ {
        self.edges.iter().flat_map(|(subject, roles)| {
            roles
                .iter()
                .map(move |role| GroupingRule::new(subject.clone(), role.clone()))
        })
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

fn detach(map: &mut BTreeMap<String, BTreeSet<String>>, from: &str, to: &str) -> bool {
    let Some(set) = map.get_mut(from) else {
        return false;
    };
    let removed = set.remove(to);
    if set.is_empty() {
        map.remove(from);
    }
    removed
}
