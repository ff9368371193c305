//! Rich diagnostic error types for the khepri engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Degradations that the
//! engine absorbs by design (missing ontology data, statement kinds unknown at
//! query time) never appear here; only boundary failures do.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the khepri engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum KhepriError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Flat(#[from] FlatError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),
}

// ---------------------------------------------------------------------------
// Flat record errors
// ---------------------------------------------------------------------------

/// Errors from parsing the flat statement record format.
#[derive(Debug, Error, Diagnostic)]
pub enum FlatError {
    #[error("unknown statement type: \"{value}\"")]
    #[diagnostic(
        code(khepri::flat::unknown_type),
        help(
            "The type tag does not name a supported statement shape. \
             Supported tags are the modification kinds (Phosphorylation, \
             Dephosphorylation, Ubiquitination, Deubiquitination, Acetylation, \
             Deacetylation), Activation, Inhibition, Complex, ActiveForm, \
             and Translocation."
        )
    )]
    UnknownStatementType { value: String },

    #[error("role \"{role}\" of {statement_type} has the wrong shape")]
    #[diagnostic(
        code(khepri::flat::role_shape),
        help(
            "Single-valued roles take an agent object or null; list-valued roles \
             take an array of agents. Check the record against the statement shape."
        )
    )]
    RoleShape {
        statement_type: String,
        role: String,
    },

    #[error("scalar field \"{name}\" of {statement_type} has the wrong type")]
    #[diagnostic(
        code(khepri::flat::scalar_type),
        help("Residues, positions, locations, and activities are strings; is_active is a boolean.")
    )]
    ScalarType {
        statement_type: String,
        name: String,
    },

    #[error("required scalar field \"{name}\" missing from {statement_type}")]
    #[diagnostic(
        code(khepri::flat::missing_scalar),
        help("ActiveForm records must carry both \"activity\" and \"is_active\".")
    )]
    MissingScalar {
        statement_type: String,
        name: String,
    },

    #[error("invalid statement hash: \"{value}\"")]
    #[diagnostic(
        code(khepri::flat::invalid_hash),
        help("Statement hashes are hexadecimal strings of at most 32 digits.")
    )]
    InvalidHash { value: String },

    #[error("JSON error: {message}")]
    #[diagnostic(
        code(khepri::flat::json),
        help("The corpus payload is not valid JSON for an array of flat statement records.")
    )]
    Json { message: String },
}

// ---------------------------------------------------------------------------
// Ontology errors
// ---------------------------------------------------------------------------

/// Errors from building the in-memory concept DAG.
#[derive(Debug, Error, Diagnostic)]
pub enum OntologyError {
    #[error("self-referential edge on concept {namespace}:{id}")]
    #[diagnostic(
        code(khepri::ontology::self_reference),
        help(
            "A concept cannot generalize itself. Refinement closure requires the \
             generalization relation to be acyclic; a self-loop is the trivial cycle."
        )
    )]
    SelfReference { namespace: String, id: String },
}

/// Convenience alias for functions returning khepri results.
pub type KhepriResult<T> = std::result::Result<T, KhepriError>;
