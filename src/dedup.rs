//! Exact-duplicate combination over content hashes.
//!
//! Many extractors reading the same literature produce the same mechanistic
//! assertion with different evidence. Statements with equal content hash are
//! semantically interchangeable, so the corpus keeps one representative per
//! hash and folds everyone else's provenance into it.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::statement::{Statement, StatementHash};

/// Outcome of a deduplication pass.
#[derive(Debug)]
pub struct DedupOutcome {
    /// One representative per distinct hash, in first-seen order.
    pub unique: Vec<Statement>,
    /// Content hash of each representative, parallel to `unique`.
    pub hashes: Vec<StatementHash>,
    /// Hash → input positions combined under it; the first position is the
    /// representative.
    pub groups: HashMap<StatementHash, Vec<usize>>,
}

/// Combine exact duplicates, merging provenance onto one representative per hash.
///
/// The first statement seen for a hash becomes the representative; every later
/// duplicate's evidence list is appended onto it in input order, and the
/// representative's belief becomes the maximum over the group (corroboration
/// never lowers confidence; belief is merged here, never computed). Support
/// adjacency is untouched. Total evidence count is conserved: the sum of
/// evidence over the input equals the sum over `unique`.
///
/// Runs in O(n); no agent or ontology access is needed.
pub fn combine_duplicates<S: AsRef<str>>(
    statements: Vec<Statement>,
    namespace_priority: &[S],
) -> DedupOutcome {
    let input = statements.len();
    let mut unique: Vec<Statement> = Vec::new();
    let mut hashes: Vec<StatementHash> = Vec::new();
    let mut groups: HashMap<StatementHash, Vec<usize>> = HashMap::new();
    let mut slot: HashMap<StatementHash, usize> = HashMap::new();

    for (position, statement) in statements.into_iter().enumerate() {
        let hash = statement.hash_with(namespace_priority);
        groups.entry(hash).or_default().push(position);
        match slot.entry(hash) {
            Entry::Vacant(vacant) => {
                vacant.insert(unique.len());
                hashes.push(hash);
                unique.push(statement);
            }
            Entry::Occupied(occupied) => {
                let representative = &mut unique[*occupied.get()];
                representative.evidence.extend(statement.evidence);
                representative.belief = representative.belief.max(statement.belief);
            }
        }
    }

    tracing::info!(input, unique = unique.len(), "combined exact duplicates");
    DedupOutcome {
        unique,
        hashes,
        groups,
    }
}
