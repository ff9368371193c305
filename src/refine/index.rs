//! Ontology-guided candidate generation.
//!
//! The filter indexes one statement kind's corpus by role and agent key, then
//! answers "which statements might this one refine (or be refined by)?" by
//! intersecting the ontology closure of the query's keys with the keys the
//! corpus actually contains. That intersection is the load-bearing pruning
//! step: the closure of a heavily-connected concept can be enormous, but only
//! observed keys can ever name a candidate.
//!
//! The result is a superset: every true refinement pair appears, false
//! positives are expected and removed by exact confirmation.

use std::collections::{HashMap, HashSet};

use crate::agent::AgentKey;
use crate::ontology::OntologyClient;
use crate::statement::{RoleBinding, RoleValue, Statement, StatementHash, StatementKind};

use super::Direction;

/// Per-role dual index: key → statements and statement → keys.
#[derive(Default)]
struct RoleIndex {
    /// Agent key → hashes of statements carrying that key in this role.
    by_key: HashMap<AgentKey, HashSet<StatementHash>>,
    /// Statement hash → keys it carries in this role.
    keys_of: HashMap<StatementHash, HashSet<AgentKey>>,
}

/// Index for one statement kind, one entry per role in the shape's role table.
struct KindIndex {
    roles: Vec<RoleIndex>,
}

impl KindIndex {
    fn new(bindings: &[RoleBinding<'_>]) -> Self {
        Self {
            roles: bindings.iter().map(|_| RoleIndex::default()).collect(),
        }
    }
}

/// Candidate generator backed by role indexes and the ontology closure.
///
/// Initialize once per statement-kind partition, then query per statement.
/// Statements of a kind never seen during initialization yield an empty
/// candidate set rather than an error.
pub struct OntologyRefinementFilter<'a> {
    ontology: &'a dyn OntologyClient,
    namespace_priority: Vec<String>,
    kinds: HashMap<StatementKind, KindIndex>,
}

impl<'a> OntologyRefinementFilter<'a> {
    /// Create an empty filter over the given ontology and key priority.
    pub fn new<S: AsRef<str>>(ontology: &'a dyn OntologyClient, namespace_priority: &[S]) -> Self {
        Self {
            ontology,
            namespace_priority: namespace_priority
                .iter()
                .map(|namespace| namespace.as_ref().to_string())
                .collect(),
            kinds: HashMap::new(),
        }
    }

    /// Index a corpus of content-addressed statements.
    pub fn initialize<'s>(
        &mut self,
        statements: impl IntoIterator<Item = (StatementHash, &'s Statement)>,
    ) {
        let mut indexed = 0usize;
        for (hash, statement) in statements {
            let kind = statement.kind();
            let bindings = statement.relation.roles();
            let entry = self
                .kinds
                .entry(kind)
                .or_insert_with(|| KindIndex::new(&bindings));
            for (at, binding) in bindings.iter().enumerate() {
                if let RoleValue::Many(members) = binding.value {
                    if members.is_empty() {
                        tracing::warn!(
                            kind = %kind,
                            role = binding.name,
                            hash = %hash,
                            "empty list role, treating as unconstrained"
                        );
                    }
                }
                let keys = keys_for_binding(binding, &self.namespace_priority);
                let role = &mut entry.roles[at];
                for key in &keys {
                    role.by_key.entry(key.clone()).or_default().insert(hash);
                }
                role.keys_of.insert(hash, keys);
            }
            indexed += 1;
        }
        tracing::debug!(
            statements = indexed,
            kinds = self.kinds.len(),
            "refinement index initialized"
        );
    }

    /// Hashes of statements the query statement might refine.
    pub fn get_less_specific(
        &self,
        hash: StatementHash,
        statement: &Statement,
    ) -> HashSet<StatementHash> {
        self.related(hash, statement, Direction::LessSpecific)
    }

    /// Hashes of statements that might refine the query statement.
    pub fn get_more_specific(
        &self,
        hash: StatementHash,
        statement: &Statement,
    ) -> HashSet<StatementHash> {
        self.related(hash, statement, Direction::MoreSpecific)
    }

    /// Candidate hashes in the given direction.
    ///
    /// Per role: the union of candidates over the query's own keys, where each
    /// key contributes the statements carrying any observed key from its
    /// ontology closure. Across roles: the intersection, since a true
    /// candidate must be compatible with every role simultaneously. The
    /// query's own hash is excluded.
    pub fn related(
        &self,
        hash: StatementHash,
        statement: &Statement,
        direction: Direction,
    ) -> HashSet<StatementHash> {
        let kind = statement.kind();
        let Some(index) = self.kinds.get(&kind) else {
            tracing::debug!(kind = %kind, "kind not indexed, no candidates");
            return HashSet::new();
        };

        let bindings = statement.relation.roles();
        let mut acc: Option<HashSet<StatementHash>> = None;
        for (at, binding) in bindings.iter().enumerate() {
            let role = &index.roles[at];
            let query_keys = role
                .keys_of
                .get(&hash)
                .cloned()
                .unwrap_or_else(|| keys_for_binding(binding, &self.namespace_priority));

            let mut role_hashes: HashSet<StatementHash> = HashSet::new();
            for key in &query_keys {
                for relevant in self.relevant_keys(role, key, direction) {
                    if let Some(found) = role.by_key.get(&relevant) {
                        role_hashes.extend(found.iter().copied());
                    }
                }
            }

            acc = Some(match acc {
                None => role_hashes,
                Some(prev) => prev.intersection(&role_hashes).copied().collect(),
            });
            if acc.as_ref().is_some_and(|found| found.is_empty()) {
                break;
            }
        }

        let mut result = acc.unwrap_or_default();
        result.remove(&hash);
        result
    }

    /// The observed keys a query key can match in the given direction.
    ///
    /// Going less specific, a key matches itself, its ancestors, and the
    /// absent-role sentinel (an unconstrained role is refined by anything).
    /// Going more specific, a key matches itself and its descendants, and the
    /// sentinel itself matches every observed key. Ungrounded name keys have
    /// no ontology closure and match only themselves (and, less specific, the
    /// sentinel). Everything is intersected with the keys the corpus observed
    /// for the role, keeping the candidate space bounded by the corpus rather
    /// than the ontology.
    fn relevant_keys(
        &self,
        role: &RoleIndex,
        key: &AgentKey,
        direction: Direction,
    ) -> Vec<AgentKey> {
        let mut relevant: HashSet<AgentKey> = HashSet::new();
        match direction {
            Direction::LessSpecific => {
                relevant.insert(AgentKey::None);
                relevant.insert(key.clone());
                if let Some((namespace, id)) = key.concept() {
                    for (ans, aid) in self.ontology.ancestors(namespace, id) {
                        relevant.insert(AgentKey::Grounded {
                            namespace: ans,
                            id: aid,
                        });
                    }
                }
            }
            Direction::MoreSpecific => {
                if matches!(key, AgentKey::None) {
                    return role.by_key.keys().cloned().collect();
                }
                relevant.insert(key.clone());
                if let Some((namespace, id)) = key.concept() {
                    for (dns, did) in self.ontology.descendants(namespace, id) {
                        relevant.insert(AgentKey::Grounded {
                            namespace: dns,
                            id: did,
                        });
                    }
                }
            }
        }
        relevant.retain(|candidate| role.by_key.contains_key(candidate));
        relevant.into_iter().collect()
    }

    /// Number of statement kinds indexed.
    pub fn kind_count(&self) -> usize {
        self.kinds.len()
    }
}

/// The set of agent keys a role contributes to the index.
///
/// An empty list role contributes the absent-role sentinel: no members means
/// no constraint.
fn keys_for_binding<S: AsRef<str>>(
    binding: &RoleBinding<'_>,
    namespace_priority: &[S],
) -> HashSet<AgentKey> {
    match binding.value {
        RoleValue::One(agent) => {
            std::iter::once(AgentKey::from_optional(agent, namespace_priority)).collect()
        }
        RoleValue::Many(members) => {
            if members.is_empty() {
                std::iter::once(AgentKey::None).collect()
            } else {
                members
                    .iter()
                    .map(|member| member.key(namespace_priority))
                    .collect()
            }
        }
    }
}
