//! # khepri
//!
//! A preassembly engine for mechanistic statements: typed assertions about
//! interactions between biological entities, produced by many independent
//! extractors and databases. The engine eliminates exact duplicates by
//! content hash while merging their provenance, then discovers refinement
//! relations against an external concept ontology and links them into a
//! directed acyclic support graph.
//!
//! ## Architecture
//!
//! - **Statement model** (`statement`): closed relation shapes over agents,
//!   evidence lists, 128-bit content identity
//! - **Ontology seam** (`ontology`): injected read-only concept oracle with a
//!   memoized in-memory DAG implementation
//! - **Deduplication** (`dedup`): hash-grouped evidence merging, one
//!   representative per distinct content hash
//! - **Refinement** (`refine`): ontology-guided candidate pruning followed by
//!   exact pairwise confirmation, never an all-pairs comparison
//! - **Pipeline** (`pipeline`): kind-partitioned, rayon-parallel orchestration
//!   into a serializable support graph
//!
//! ## Library usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use khepri::agent::Agent;
//! use khepri::ontology::{EdgeKind, InMemoryOntology};
//! use khepri::pipeline::Preassembler;
//! use khepri::statement::{Relation, Statement};
//!
//! let ontology = InMemoryOntology::new();
//! ontology
//!     .add_edge("HGNC", "6407", "FPLX", "RAS", EdgeKind::IsA)
//!     .unwrap();
//!
//! let member = Statement::new(Relation::Complex {
//!     members: vec![
//!         Agent::new("KRAS").with_grounding("HGNC", "6407"),
//!         Agent::new("RAF1").with_grounding("HGNC", "9829"),
//!     ],
//! });
//! let family = Statement::new(Relation::Complex {
//!     members: vec![
//!         Agent::new("RAS").with_grounding("FPLX", "RAS"),
//!         Agent::new("RAF1").with_grounding("HGNC", "9829"),
//!     ],
//! });
//!
//! let preassembler = Preassembler::new(Arc::new(ontology));
//! let result = preassembler.preassemble(vec![member, family]);
//! // The member-level statement refines the family-level one.
//! assert_eq!(result.edges.len(), 1);
//! assert_eq!(result.top_level.len(), 1);
//! ```

pub mod agent;
pub mod dedup;
pub mod error;
pub mod flat;
pub mod ontology;
pub mod pipeline;
pub mod refine;
pub mod statement;
