//! Ontology client seam and the in-memory concept DAG.
//!
//! The engine consumes the ontology as a read-only oracle through the
//! [`OntologyClient`] trait and never looks one up as ambient global state:
//! the pipeline takes its client by explicit injection so tests can substitute
//! a small fixture. [`InMemoryOntology`] is the default implementation, a
//! typed-edge DAG over concept nodes with memoized transitive closure.

use std::collections::{HashSet, VecDeque};
use std::sync::RwLock;

use dashmap::DashMap;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::agent::ConceptRef;
use crate::error::OntologyError;

/// Result type for ontology construction.
pub type OntologyResult<T> = std::result::Result<T, OntologyError>;

/// Typed edge kinds in the concept DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Instance/subclass generalization.
    IsA,
    /// Component-of generalization.
    PartOf,
}

/// Read-only oracle for concept generalization.
///
/// Both methods are total: an unknown concept yields the empty set, never an
/// error. Implementations must tolerate concurrent queries from multiple
/// workers; the engine performs no ontology writes during preassembly.
pub trait OntologyClient: Send + Sync {
    /// All concepts transitively more general than the given one.
    fn ancestors(&self, namespace: &str, id: &str) -> HashSet<ConceptRef>;

    /// All concepts transitively more specific than the given one.
    fn descendants(&self, namespace: &str, id: &str) -> HashSet<ConceptRef>;
}

/// In-memory concept DAG with memoized transitive closure.
///
/// Edges point from the more specific concept to the more general one
/// (`KRAS --IsA--> RAS`). Closure queries traverse only the edge kinds the
/// ontology was configured with, so a client built over `IsA` alone never
/// conflates component relations with subtyping. Termination of the closure
/// depends on the loaded relation being acyclic; the engine does not enforce
/// this beyond rejecting trivial self-loops.
pub struct InMemoryOntology {
    /// The directed graph: nodes are concepts, edges carry their kind.
    graph: RwLock<DiGraph<ConceptRef, EdgeKind>>,
    /// Concept → NodeIndex mapping for O(1) node lookups.
    node_index: DashMap<ConceptRef, NodeIndex>,
    /// Edge kinds traversed by closure queries.
    closure_kinds: Vec<EdgeKind>,
    /// Memoized ancestor closures.
    ancestor_cache: DashMap<ConceptRef, HashSet<ConceptRef>>,
    /// Memoized descendant closures.
    descendant_cache: DashMap<ConceptRef, HashSet<ConceptRef>>,
}

impl InMemoryOntology {
    /// Create an empty ontology whose closure follows both `IsA` and `PartOf`.
    pub fn new() -> Self {
        Self::with_closure_kinds(vec![EdgeKind::IsA, EdgeKind::PartOf])
    }

    /// Create an empty ontology with an explicit closure relation set.
    pub fn with_closure_kinds(closure_kinds: Vec<EdgeKind>) -> Self {
        Self {
            graph: RwLock::new(DiGraph::new()),
            node_index: DashMap::new(),
            closure_kinds,
            ancestor_cache: DashMap::new(),
            descendant_cache: DashMap::new(),
        }
    }

    /// Ensure a node exists for the given concept, returning its NodeIndex.
    fn ensure_node(&self, concept: &ConceptRef) -> NodeIndex {
        if let Some(idx) = self.node_index.get(concept) {
            return *idx.value();
        }
        let mut graph = self.graph.write().expect("ontology lock poisoned");
        // Double-check after acquiring write lock
        if let Some(idx) = self.node_index.get(concept) {
            return *idx.value();
        }
        let idx = graph.add_node(concept.clone());
        self.node_index.insert(concept.clone(), idx);
        idx
    }

    /// Insert a generalization edge from a child concept to its parent.
    ///
    /// Invalidates the memoized closures; loading the full ontology before the
    /// first query keeps the cache warm for the whole preassembly run.
    pub fn add_edge(
        &self,
        child_ns: &str,
        child_id: &str,
        parent_ns: &str,
        parent_id: &str,
        kind: EdgeKind,
    ) -> OntologyResult<()> {
        if child_ns == parent_ns && child_id == parent_id {
            return Err(OntologyError::SelfReference {
                namespace: child_ns.to_string(),
                id: child_id.to_string(),
            });
        }
        let child = (child_ns.to_string(), child_id.to_string());
        let parent = (parent_ns.to_string(), parent_id.to_string());
        let child_idx = self.ensure_node(&child);
        let parent_idx = self.ensure_node(&parent);
        {
            let mut graph = self.graph.write().expect("ontology lock poisoned");
            graph.add_edge(child_idx, parent_idx, kind);
        }
        self.ancestor_cache.clear();
        self.descendant_cache.clear();
        Ok(())
    }

    /// BFS closure from a concept along closure-kind edges in one direction.
    fn closure(&self, concept: &ConceptRef, direction: Direction) -> HashSet<ConceptRef> {
        let start = match self.node_index.get(concept) {
            Some(idx) => *idx.value(),
            None => return HashSet::new(),
        };
        let graph = self.graph.read().expect("ontology lock poisoned");

        let mut reached = HashSet::new();
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for edge in graph.edges_directed(current, direction) {
                if !self.closure_kinds.contains(edge.weight()) {
                    continue;
                }
                let next = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                if visited.insert(next) {
                    if let Some(found) = graph.node_weight(next) {
                        reached.insert(found.clone());
                    }
                    queue.push_back(next);
                }
            }
        }
        reached
    }

    /// Number of concept nodes.
    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    /// Number of generalization edges.
    pub fn edge_count(&self) -> usize {
        self.graph.read().expect("ontology lock poisoned").edge_count()
    }
}

impl OntologyClient for InMemoryOntology {
    fn ancestors(&self, namespace: &str, id: &str) -> HashSet<ConceptRef> {
        let concept = (namespace.to_string(), id.to_string());
        if let Some(hit) = self.ancestor_cache.get(&concept) {
            return hit.value().clone();
        }
        let closure = self.closure(&concept, Direction::Outgoing);
        self.ancestor_cache.insert(concept, closure.clone());
        closure
    }

    fn descendants(&self, namespace: &str, id: &str) -> HashSet<ConceptRef> {
        let concept = (namespace.to_string(), id.to_string());
        if let Some(hit) = self.descendant_cache.get(&concept) {
            return hit.value().clone();
        }
        let closure = self.closure(&concept, Direction::Incoming);
        self.descendant_cache.insert(concept, closure.clone());
        closure
    }
}

impl Default for InMemoryOntology {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryOntology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryOntology")
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept(ns: &str, id: &str) -> ConceptRef {
        (ns.to_string(), id.to_string())
    }

    fn ras_family() -> InMemoryOntology {
        let ontology = InMemoryOntology::new();
        ontology
            .add_edge("HGNC", "6407", "FPLX", "RAS", EdgeKind::IsA)
            .unwrap();
        ontology
            .add_edge("HGNC", "5173", "FPLX", "RAS", EdgeKind::IsA)
            .unwrap();
        ontology
            .add_edge("FPLX", "RAS", "FPLX", "GTPASE", EdgeKind::IsA)
            .unwrap();
        ontology
    }

    #[test]
    fn transitive_ancestors() {
        let ontology = ras_family();
        let up = ontology.ancestors("HGNC", "6407");
        assert_eq!(up.len(), 2);
        assert!(up.contains(&concept("FPLX", "RAS")));
        assert!(up.contains(&concept("FPLX", "GTPASE")));
    }

    #[test]
    fn transitive_descendants() {
        let ontology = ras_family();
        let down = ontology.descendants("FPLX", "GTPASE");
        assert_eq!(down.len(), 3);
        assert!(down.contains(&concept("FPLX", "RAS")));
        assert!(down.contains(&concept("HGNC", "6407")));
        assert!(down.contains(&concept("HGNC", "5173")));
    }

    #[test]
    fn unknown_concept_yields_empty_sets() {
        let ontology = ras_family();
        assert!(ontology.ancestors("HGNC", "0000").is_empty());
        assert!(ontology.descendants("XXXX", "1").is_empty());
    }

    #[test]
    fn closure_kinds_filter_traversal() {
        let ontology = InMemoryOntology::with_closure_kinds(vec![EdgeKind::IsA]);
        ontology
            .add_edge("HGNC", "6407", "FPLX", "RAS", EdgeKind::IsA)
            .unwrap();
        ontology
            .add_edge("FPLX", "RAS", "GO", "0005886", EdgeKind::PartOf)
            .unwrap();
        let up = ontology.ancestors("HGNC", "6407");
        assert_eq!(up.len(), 1);
        assert!(up.contains(&concept("FPLX", "RAS")));
    }

    #[test]
    fn partof_included_by_default() {
        let ontology = InMemoryOntology::new();
        ontology
            .add_edge("FPLX", "RAS", "GO", "0005886", EdgeKind::PartOf)
            .unwrap();
        assert!(
            ontology
                .ancestors("FPLX", "RAS")
                .contains(&concept("GO", "0005886"))
        );
    }

    #[test]
    fn self_reference_rejected() {
        let ontology = InMemoryOntology::new();
        let err = ontology
            .add_edge("FPLX", "RAS", "FPLX", "RAS", EdgeKind::IsA)
            .unwrap_err();
        assert!(matches!(err, OntologyError::SelfReference { .. }));
    }

    #[test]
    fn closure_cache_invalidated_on_mutation() {
        let ontology = InMemoryOntology::new();
        ontology
            .add_edge("HGNC", "6407", "FPLX", "RAS", EdgeKind::IsA)
            .unwrap();
        assert_eq!(ontology.ancestors("HGNC", "6407").len(), 1);

        ontology
            .add_edge("FPLX", "RAS", "FPLX", "GTPASE", EdgeKind::IsA)
            .unwrap();
        assert_eq!(ontology.ancestors("HGNC", "6407").len(), 2);
    }
}
