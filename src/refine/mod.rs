//! Refinement discovery: ontology-guided candidate generation and exact
//! confirmation.
//!
//! Refinement is a strict partial order between statements of the same shape:
//! one statement is more specific than another when every role's agents are
//! equal to or descend from the other's and every scalar the other specifies
//! is matched exactly. Discovery runs in two stages so the corpus never pays
//! an all-pairs comparison: [`index::OntologyRefinementFilter`] prunes to a
//! candidate superset using the ontology's closure, then [`confirm`] runs the
//! exact predicate on what survives.

pub mod confirm;
pub mod index;

use serde::{Deserialize, Serialize};

use crate::statement::StatementHash;

/// Direction of a refinement query relative to the query statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Statements the query statement might refine.
    LessSpecific,
    /// Statements that might refine the query statement.
    MoreSpecific,
}

/// A confirmed refinement relation between two statements.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RefinementEdge {
    /// The more specific statement.
    pub specific: StatementHash,
    /// The more general statement it refines.
    pub general: StatementHash,
}
