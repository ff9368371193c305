//! Preassembly orchestration: dedup → refinement discovery → support graph.
//!
//! The pipeline is a pure batch computation over an in-memory corpus. Each
//! statement-kind partition is independent of every other, so kinds whose
//! groups are large enough to amortize dispatch run on the rayon pool while
//! small groups run inline. Workers only read: they receive one kind's
//! statements and the shared read-only ontology and return plain edge lists.
//! All `supports`/`supported_by` mutation happens in one serial pass after
//! every worker has reported, so no statement is ever half-linked and no two
//! workers race on shared state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::agent::DEFAULT_NAMESPACE_PRIORITY;
use crate::dedup::{DedupOutcome, combine_duplicates};
use crate::ontology::OntologyClient;
use crate::refine::confirm::confirm_candidates;
use crate::refine::index::OntologyRefinementFilter;
use crate::refine::{Direction, RefinementEdge};
use crate::statement::{Statement, StatementHash, StatementKind};

/// Configuration for the preassembly pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreassemblyConfig {
    /// Statement-kind groups at or above this size are dispatched to the
    /// rayon pool; smaller groups run inline in the coordinating thread.
    pub parallel_threshold: usize,
    /// Namespace priority order for agent key derivation.
    pub namespace_priority: Vec<String>,
}

impl Default for PreassemblyConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 64,
            namespace_priority: DEFAULT_NAMESPACE_PRIORITY
                .iter()
                .map(|namespace| namespace.to_string())
                .collect(),
        }
    }
}

/// Output of a preassembly run.
///
/// Statements reference each other by content hash, so the result is plain
/// serializable data with no object-graph cycles.
#[derive(Debug)]
pub struct PreassemblyResult {
    /// Deduplicated statements with populated support sets, first-seen order.
    pub statements: Vec<Statement>,
    /// Content hash of each statement, parallel to `statements`.
    pub hashes: Vec<StatementHash>,
    /// Every confirmed refinement edge, sorted.
    pub edges: Vec<RefinementEdge>,
    /// Hashes of statements no more specific statement refines: the maximally
    /// specific representatives of their refinement chains.
    pub top_level: Vec<StatementHash>,
}

impl PreassemblyResult {
    /// Look up a statement by its content hash.
    pub fn statement(&self, hash: StatementHash) -> Option<&Statement> {
        self.hashes
            .iter()
            .position(|&candidate| candidate == hash)
            .map(|at| &self.statements[at])
    }

    /// The top-level subset as statement references.
    pub fn top_level_statements(&self) -> Vec<&Statement> {
        self.statements
            .iter()
            .filter(|statement| statement.supported_by.is_empty())
            .collect()
    }
}

/// The preassembly engine facade.
///
/// Owns its configuration and an injected ontology client; holds no other
/// state, so one instance can preassemble any number of corpora.
pub struct Preassembler {
    config: PreassemblyConfig,
    ontology: Arc<dyn OntologyClient>,
}

impl Preassembler {
    /// Create a preassembler with the default configuration.
    pub fn new(ontology: Arc<dyn OntologyClient>) -> Self {
        Self::with_config(ontology, PreassemblyConfig::default())
    }

    /// Create a preassembler with an explicit configuration.
    pub fn with_config(ontology: Arc<dyn OntologyClient>, config: PreassemblyConfig) -> Self {
        tracing::info!(
            parallel_threshold = config.parallel_threshold,
            "initializing preassembler"
        );
        Self { config, ontology }
    }

    /// The active configuration.
    pub fn config(&self) -> &PreassemblyConfig {
        &self.config
    }

    /// Run the full preassembly pipeline.
    ///
    /// Statement order matters only for duplicate groups: the first statement
    /// seen for a hash becomes the group's representative. The support sets
    /// are owned by this engine and recomputed from scratch on every run, so
    /// the resulting graph is fully determined by the input corpus and the
    /// ontology snapshot.
    pub fn preassemble(&self, statements: Vec<Statement>) -> PreassemblyResult {
        let input = statements.len();
        let DedupOutcome {
            mut unique, hashes, ..
        } = combine_duplicates(statements, &self.config.namespace_priority);

        for statement in &mut unique {
            statement.supports.clear();
            statement.supported_by.clear();
        }

        let mut by_kind: BTreeMap<StatementKind, Vec<usize>> = BTreeMap::new();
        for (at, statement) in unique.iter().enumerate() {
            by_kind.entry(statement.kind()).or_default().push(at);
        }

        let mut edges: Vec<RefinementEdge> = Vec::new();
        {
            let corpus: HashMap<StatementHash, &Statement> =
                hashes.iter().copied().zip(unique.iter()).collect();
            let (pooled, inline): (Vec<_>, Vec<_>) = by_kind
                .iter()
                .partition(|(_, members)| members.len() >= self.config.parallel_threshold);

            for (kind, members) in inline {
                edges.extend(self.edges_for_kind(*kind, members, &hashes, &unique, &corpus));
            }
            let pooled_edges: Vec<Vec<RefinementEdge>> = pooled
                .par_iter()
                .map(|(kind, members)| {
                    self.edges_for_kind(**kind, members, &hashes, &unique, &corpus)
                })
                .collect();
            for batch in pooled_edges {
                edges.extend(batch);
            }
        }
        // Sorting makes the edge list independent of which groups ran where.
        edges.sort_unstable();
        edges.dedup();

        // Apply both sides of every edge in one serial pass.
        let slot: HashMap<StatementHash, usize> = hashes
            .iter()
            .copied()
            .enumerate()
            .map(|(at, hash)| (hash, at))
            .collect();
        for edge in &edges {
            let (Some(&s_at), Some(&g_at)) = (slot.get(&edge.specific), slot.get(&edge.general))
            else {
                continue;
            };
            unique[s_at].supports.insert(edge.general);
            unique[g_at].supported_by.insert(edge.specific);
        }

        let top_level: Vec<StatementHash> = hashes
            .iter()
            .copied()
            .zip(unique.iter())
            .filter(|(_, statement)| statement.supported_by.is_empty())
            .map(|(hash, _)| hash)
            .collect();

        tracing::info!(
            input,
            unique = unique.len(),
            edges = edges.len(),
            top_level = top_level.len(),
            "preassembly complete"
        );
        PreassemblyResult {
            statements: unique,
            hashes,
            edges,
            top_level,
        }
    }

    /// Candidate generation plus confirmation for one statement kind.
    fn edges_for_kind(
        &self,
        kind: StatementKind,
        members: &[usize],
        hashes: &[StatementHash],
        unique: &[Statement],
        corpus: &HashMap<StatementHash, &Statement>,
    ) -> Vec<RefinementEdge> {
        let mut filter =
            OntologyRefinementFilter::new(self.ontology.as_ref(), &self.config.namespace_priority);
        filter.initialize(members.iter().map(|&at| (hashes[at], &unique[at])));

        let mut edges = Vec::new();
        for &at in members {
            let hash = hashes[at];
            let statement = &unique[at];
            let candidates = filter.get_less_specific(hash, statement);
            if candidates.is_empty() {
                continue;
            }
            let confirmed = confirm_candidates(
                statement,
                &candidates,
                Direction::LessSpecific,
                corpus,
                self.ontology.as_ref(),
                &self.config.namespace_priority,
            );
            edges.extend(
                confirmed
                    .into_iter()
                    .map(|general| RefinementEdge {
                        specific: hash,
                        general,
                    }),
            );
        }
        tracing::debug!(
            kind = %kind,
            statements = members.len(),
            edges = edges.len(),
            "confirmed refinements"
        );
        edges
    }
}
