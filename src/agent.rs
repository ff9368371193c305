//! Agents and their canonical comparison keys.
//!
//! An [`Agent`] is a participant entity in a statement, optionally grounded to
//! one or more ontology concepts. Agents arrive fully formed from upstream
//! extractors; the engine never mutates groundings. All dedup and refinement
//! comparisons go through the derived [`AgentKey`], never the raw agent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A `(namespace, identifier)` pair naming a concept in the ontology.
pub type ConceptRef = (String, String);

/// Default namespace priority for agent key derivation.
///
/// When an agent carries groundings in several namespaces, the first namespace
/// in this list that is present wins. Callers with different curation
/// preferences pass their own order through `PreassemblyConfig`.
pub const DEFAULT_NAMESPACE_PRIORITY: [&str; 6] = ["FPLX", "HGNC", "UP", "CHEBI", "GO", "MESH"];

/// A participant entity in a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Literal name as produced by the upstream extractor.
    pub name: String,
    /// Grounding map: ontology namespace → concept identifier.
    ///
    /// Empty means the agent is ungrounded and is compared by literal name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub groundings: BTreeMap<String, String>,
}

impl Agent {
    /// Create an ungrounded agent.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groundings: BTreeMap::new(),
        }
    }

    /// Attach a grounding entry.
    pub fn with_grounding(mut self, namespace: impl Into<String>, id: impl Into<String>) -> Self {
        self.groundings.insert(namespace.into(), id.into());
        self
    }

    /// Whether the agent carries at least one grounding entry.
    pub fn is_grounded(&self) -> bool {
        !self.groundings.is_empty()
    }

    /// Derive the canonical comparison key for this agent.
    ///
    /// The first namespace in `namespace_priority` with a grounding entry wins.
    /// When none matches, the lexicographically smallest namespace present is
    /// used, so key derivation stays deterministic across runs. Ungrounded
    /// agents fall back to their literal name: two ungrounded agents with
    /// different names are never considered related.
    pub fn key<S: AsRef<str>>(&self, namespace_priority: &[S]) -> AgentKey {
        for namespace in namespace_priority {
            if let Some(id) = self.groundings.get(namespace.as_ref()) {
                return AgentKey::Grounded {
                    namespace: namespace.as_ref().to_string(),
                    id: id.clone(),
                };
            }
        }
        if let Some((namespace, id)) = self.groundings.iter().next() {
            return AgentKey::Grounded {
                namespace: namespace.clone(),
                id: id.clone(),
            };
        }
        AgentKey::Name(self.name.clone())
    }
}

/// The canonical grounding-or-name key agents are compared by.
///
/// `None` is the key of an absent optional role (e.g. an unknown catalyst) and
/// of an empty list role. It is maximally general: any concrete agent refines
/// an absent one, while an absent agent refines nothing but another absence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentKey {
    /// Canonical grounding pair.
    Grounded { namespace: String, id: String },
    /// Ungrounded fallback: the agent's literal name.
    Name(String),
    /// Absent optional role or empty list role.
    None,
}

impl AgentKey {
    /// Derive the key of an optional single-valued role.
    pub fn from_optional<S: AsRef<str>>(agent: Option<&Agent>, namespace_priority: &[S]) -> Self {
        match agent {
            Some(agent) => agent.key(namespace_priority),
            None => AgentKey::None,
        }
    }

    /// The grounding pair, if this key is grounded.
    pub fn concept(&self) -> Option<(&str, &str)> {
        match self {
            AgentKey::Grounded { namespace, id } => Some((namespace, id)),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentKey::Grounded { namespace, id } => write!(f, "{namespace}:{id}"),
            AgentKey::Name(name) => write!(f, "name:{name}"),
            AgentKey::None => write!(f, "none"),
        }
    }
}
