//! Statement model: closed relation shapes, evidence, and content identity.
//!
//! A [`Statement`] is a typed assertion over agents with an attached evidence
//! list and a derived 128-bit content hash. The relation shapes form a closed
//! tagged-variant set; [`Relation::roles`] is the single role table both the
//! candidate index and the confirmation predicate dispatch over, so the two
//! can never disagree about which roles are single- or list-valued.
//!
//! The content hash covers the statement's shape only (kind tag, role keys,
//! scalar parameters) and explicitly excludes evidence, belief, and the
//! support adjacency sets: two statements with equal hash are exact duplicates
//! whose provenance can be merged.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::agent::{Agent, AgentKey};

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

/// A provenance record attached to a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Name of the extractor or database that produced the statement.
    pub source_api: String,
    /// Source-internal identifier for the extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Literature identifier the evidence was read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmid: Option<String>,
    /// Free-text span supporting the statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Source-specific annotations, passed through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, serde_json::Value>,
}

impl Evidence {
    /// Create a new evidence record from a source name.
    pub fn new(source_api: impl Into<String>) -> Self {
        Self {
            source_api: source_api.into(),
            source_id: None,
            pmid: None,
            text: None,
            annotations: BTreeMap::new(),
        }
    }

    /// Attach the supporting text span.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Attach the literature identifier.
    pub fn with_pmid(mut self, pmid: impl Into<String>) -> Self {
        self.pmid = Some(pmid.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Relation shapes
// ---------------------------------------------------------------------------

/// Sub-kinds of the modification shape. Distinct kinds partition separately
/// and are never compared for refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModificationKind {
    Phosphorylation,
    Dephosphorylation,
    Ubiquitination,
    Deubiquitination,
    Acetylation,
    Deacetylation,
}

/// Sub-kinds of the regulation shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegulationKind {
    Activation,
    Inhibition,
}

/// The closed set of relation shapes.
///
/// Each variant defines an ordered role table (see [`Relation::roles`]) and an
/// ordered scalar-field table (see [`Relation::scalars`]). Optional agents
/// model unknown participants (e.g. an unknown catalyst); a `None` role is
/// maximally general and is refined by any concrete agent in that role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum Relation {
    /// Asymmetric binary modification with optional site scalars.
    Modification {
        kind: ModificationKind,
        enz: Option<Agent>,
        sub: Option<Agent>,
        residue: Option<String>,
        position: Option<String>,
    },
    /// Asymmetric binary regulation.
    Regulation {
        kind: RegulationKind,
        subj: Option<Agent>,
        obj: Option<Agent>,
    },
    /// Symmetric n-ary complex membership.
    Complex { members: Vec<Agent> },
    /// Unary activity assertion; both scalars must match exactly for refinement.
    ActiveForm {
        agent: Option<Agent>,
        activity: String,
        is_active: bool,
    },
    /// Unary localization change with optional compartment scalars.
    Translocation {
        agent: Option<Agent>,
        from_location: Option<String>,
        to_location: Option<String>,
    },
}

/// The partition tag of a statement: one value per comparable statement type.
///
/// Refinement is only ever checked within one tag; the orchestrator partitions
/// the corpus by this value before building any index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum StatementKind {
    Phosphorylation,
    Dephosphorylation,
    Ubiquitination,
    Deubiquitination,
    Acetylation,
    Deacetylation,
    Activation,
    Inhibition,
    Complex,
    ActiveForm,
    Translocation,
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            StatementKind::Phosphorylation => "Phosphorylation",
            StatementKind::Dephosphorylation => "Dephosphorylation",
            StatementKind::Ubiquitination => "Ubiquitination",
            StatementKind::Deubiquitination => "Deubiquitination",
            StatementKind::Acetylation => "Acetylation",
            StatementKind::Deacetylation => "Deacetylation",
            StatementKind::Activation => "Activation",
            StatementKind::Inhibition => "Inhibition",
            StatementKind::Complex => "Complex",
            StatementKind::ActiveForm => "ActiveForm",
            StatementKind::Translocation => "Translocation",
        };
        write!(f, "{tag}")
    }
}

/// A role's agents as seen by the refinement machinery.
#[derive(Debug, Clone, Copy)]
pub enum RoleValue<'a> {
    /// Single agent-or-none role.
    One(Option<&'a Agent>),
    /// List-valued role (symmetric membership).
    Many(&'a [Agent]),
}

/// One entry of a shape's ordered role table.
#[derive(Debug, Clone, Copy)]
pub struct RoleBinding<'a> {
    /// Stable role name within the statement shape.
    pub name: &'static str,
    /// The role's agents.
    pub value: RoleValue<'a>,
}

impl Relation {
    /// The partition tag of this relation.
    pub fn kind(&self) -> StatementKind {
        match self {
            Relation::Modification { kind, .. } => match kind {
                ModificationKind::Phosphorylation => StatementKind::Phosphorylation,
                ModificationKind::Dephosphorylation => StatementKind::Dephosphorylation,
                ModificationKind::Ubiquitination => StatementKind::Ubiquitination,
                ModificationKind::Deubiquitination => StatementKind::Deubiquitination,
                ModificationKind::Acetylation => StatementKind::Acetylation,
                ModificationKind::Deacetylation => StatementKind::Deacetylation,
            },
            Relation::Regulation { kind, .. } => match kind {
                RegulationKind::Activation => StatementKind::Activation,
                RegulationKind::Inhibition => StatementKind::Inhibition,
            },
            Relation::Complex { .. } => StatementKind::Complex,
            Relation::ActiveForm { .. } => StatementKind::ActiveForm,
            Relation::Translocation { .. } => StatementKind::Translocation,
        }
    }

    /// The ordered role table for this shape.
    ///
    /// This is the one source of truth for role names, order, and whether a
    /// role is single- or list-valued. Candidate indexing and refinement
    /// confirmation both dispatch over it.
    pub fn roles(&self) -> Vec<RoleBinding<'_>> {
        match self {
            Relation::Modification { enz, sub, .. } => vec![
                RoleBinding {
                    name: "enz",
                    value: RoleValue::One(enz.as_ref()),
                },
                RoleBinding {
                    name: "sub",
                    value: RoleValue::One(sub.as_ref()),
                },
            ],
            Relation::Regulation { subj, obj, .. } => vec![
                RoleBinding {
                    name: "subj",
                    value: RoleValue::One(subj.as_ref()),
                },
                RoleBinding {
                    name: "obj",
                    value: RoleValue::One(obj.as_ref()),
                },
            ],
            Relation::Complex { members } => vec![RoleBinding {
                name: "members",
                value: RoleValue::Many(members),
            }],
            Relation::ActiveForm { agent, .. } => vec![RoleBinding {
                name: "agent",
                value: RoleValue::One(agent.as_ref()),
            }],
            Relation::Translocation { agent, .. } => vec![RoleBinding {
                name: "agent",
                value: RoleValue::One(agent.as_ref()),
            }],
        }
    }

    /// The ordered scalar-field table for this shape.
    ///
    /// An absent value is unconstrained: a statement that specifies a scalar
    /// refines an otherwise-identical statement that leaves it unspecified,
    /// while two different specified values are never related.
    pub fn scalars(&self) -> Vec<(&'static str, Option<String>)> {
        match self {
            Relation::Modification {
                residue, position, ..
            } => vec![
                ("residue", residue.clone()),
                ("position", position.clone()),
            ],
            Relation::Regulation { .. } | Relation::Complex { .. } => vec![],
            Relation::ActiveForm {
                activity,
                is_active,
                ..
            } => vec![
                ("activity", Some(activity.clone())),
                ("is_active", Some(is_active.to_string())),
            ],
            Relation::Translocation {
                from_location,
                to_location,
                ..
            } => vec![
                ("from_location", from_location.clone()),
                ("to_location", to_location.clone()),
            ],
        }
    }

    /// Compute the content hash of this relation under a namespace priority.
    pub fn hash_with<S: AsRef<str>>(&self, namespace_priority: &[S]) -> StatementHash {
        let key = ShapeKey::of(self, namespace_priority);
        let bytes = bincode::serialize(&key).expect("shape key encoding cannot fail");
        let digest = Sha256::digest(&bytes);
        let mut truncated = [0u8; 16];
        truncated.copy_from_slice(&digest[..16]);
        StatementHash(u128::from_be_bytes(truncated))
    }
}

// ---------------------------------------------------------------------------
// Content identity
// ---------------------------------------------------------------------------

/// Canonical, order-stable encoding of a statement's shape, fed to the hash.
///
/// List-role keys are sorted so member order never affects identity; the
/// per-role key vectors keep multiplicity so a two-member complex never
/// collides with a one-member complex over the same concept.
#[derive(Serialize)]
struct ShapeKey {
    kind: StatementKind,
    roles: Vec<(&'static str, Vec<AgentKey>)>,
    scalars: Vec<(&'static str, Option<String>)>,
}

impl ShapeKey {
    fn of<S: AsRef<str>>(relation: &Relation, namespace_priority: &[S]) -> Self {
        let roles = relation
            .roles()
            .iter()
            .map(|binding| {
                let keys = match binding.value {
                    RoleValue::One(agent) => {
                        vec![AgentKey::from_optional(agent, namespace_priority)]
                    }
                    RoleValue::Many(members) => {
                        if members.is_empty() {
                            vec![AgentKey::None]
                        } else {
                            let mut keys: Vec<AgentKey> = members
                                .iter()
                                .map(|member| member.key(namespace_priority))
                                .collect();
                            keys.sort();
                            keys
                        }
                    }
                };
                (binding.name, keys)
            })
            .collect();
        Self {
            kind: relation.kind(),
            roles,
            scalars: relation.scalars(),
        }
    }
}

/// Content hash identifying a statement's shape.
///
/// The first 128 bits of SHA-256 over the bincode encoding of the shape key.
/// The deduplicator trusts hash equality as semantic equality, so collision
/// resistance is load-bearing; 128 bits keeps accidental collisions out of
/// reach even for corpora far beyond the hundreds of thousands of statements
/// this engine targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementHash(pub u128);

impl StatementHash {
    /// Parse a hash from its hexadecimal form.
    ///
    /// Returns `None` for anything that is not a hex string of at most 32 digits.
    pub fn from_hex(value: &str) -> Option<Self> {
        u128::from_str_radix(value, 16).ok().map(StatementHash)
    }
}

impl std::fmt::Display for StatementHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl Serialize for StatementHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StatementHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        StatementHash::from_hex(&value).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid statement hash: \"{value}\""))
        })
    }
}

// ---------------------------------------------------------------------------
// Statement
// ---------------------------------------------------------------------------

fn default_belief() -> f64 {
    1.0
}

/// A typed assertion with provenance and support-graph adjacency.
///
/// The `supports`/`supported_by` sets reference other statements by content
/// hash, not by object reference, so a preassembled corpus stays serializable.
/// They are populated only by the preassembly pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// The typed role assignment.
    pub relation: Relation,
    /// Provenance records, one per extraction.
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    /// Externally computed confidence score; read and merged, never computed here.
    #[serde(default = "default_belief")]
    pub belief: f64,
    /// Hashes of the more general statements this one refines.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub supports: BTreeSet<StatementHash>,
    /// Hashes of the more specific statements that refine this one.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub supported_by: BTreeSet<StatementHash>,
}

impl Statement {
    /// Create a statement with no evidence and full belief.
    pub fn new(relation: Relation) -> Self {
        Self {
            relation,
            evidence: Vec::new(),
            belief: 1.0,
            supports: BTreeSet::new(),
            supported_by: BTreeSet::new(),
        }
    }

    /// Append an evidence record.
    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    /// Set the belief score.
    pub fn with_belief(mut self, belief: f64) -> Self {
        self.belief = belief;
        self
    }

    /// The partition tag of this statement.
    pub fn kind(&self) -> StatementKind {
        self.relation.kind()
    }

    /// Compute the content hash under a namespace priority.
    ///
    /// Pure in everything but the relation: evidence, belief, and the support
    /// sets never contribute.
    pub fn hash_with<S: AsRef<str>>(&self, namespace_priority: &[S]) -> StatementHash {
        self.relation.hash_with(namespace_priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::DEFAULT_NAMESPACE_PRIORITY;

    fn kras() -> Agent {
        Agent::new("KRAS").with_grounding("HGNC", "6407")
    }

    fn braf() -> Agent {
        Agent::new("BRAF").with_grounding("HGNC", "1097")
    }

    fn phos(residue: Option<&str>, position: Option<&str>) -> Statement {
        Statement::new(Relation::Modification {
            kind: ModificationKind::Phosphorylation,
            enz: Some(kras()),
            sub: Some(braf()),
            residue: residue.map(String::from),
            position: position.map(String::from),
        })
    }

    fn hash(statement: &Statement) -> StatementHash {
        statement.hash_with(&DEFAULT_NAMESPACE_PRIORITY)
    }

    #[test]
    fn hash_ignores_evidence_belief_and_support() {
        let bare = phos(None, None);
        let mut dressed = phos(None, None)
            .with_evidence(Evidence::new("reach").with_text("KRAS phosphorylates BRAF"))
            .with_belief(0.42);
        dressed.supports.insert(StatementHash(7));
        dressed.supported_by.insert(StatementHash(8));
        assert_eq!(hash(&bare), hash(&dressed));
    }

    #[test]
    fn hash_distinguishes_sites() {
        assert_ne!(hash(&phos(None, None)), hash(&phos(Some("S"), Some("222"))));
        assert_ne!(
            hash(&phos(Some("S"), Some("222"))),
            hash(&phos(Some("T"), Some("222")))
        );
    }

    #[test]
    fn hash_distinguishes_modification_kinds() {
        let phosphorylation = phos(None, None);
        let ubiquitination = Statement::new(Relation::Modification {
            kind: ModificationKind::Ubiquitination,
            enz: Some(kras()),
            sub: Some(braf()),
            residue: None,
            position: None,
        });
        assert_ne!(hash(&phosphorylation), hash(&ubiquitination));
    }

    #[test]
    fn complex_member_order_does_not_affect_hash() {
        let forward = Statement::new(Relation::Complex {
            members: vec![kras(), braf()],
        });
        let reverse = Statement::new(Relation::Complex {
            members: vec![braf(), kras()],
        });
        assert_eq!(hash(&forward), hash(&reverse));
    }

    #[test]
    fn complex_member_multiplicity_affects_hash() {
        let single = Statement::new(Relation::Complex {
            members: vec![kras()],
        });
        let dimer = Statement::new(Relation::Complex {
            members: vec![kras(), kras()],
        });
        assert_ne!(hash(&single), hash(&dimer));
    }

    #[test]
    fn absent_and_present_enzyme_hash_differently() {
        let with_enzyme = phos(None, None);
        let without_enzyme = Statement::new(Relation::Modification {
            kind: ModificationKind::Phosphorylation,
            enz: None,
            sub: Some(braf()),
            residue: None,
            position: None,
        });
        assert_ne!(hash(&with_enzyme), hash(&without_enzyme));
    }

    #[test]
    fn hash_hex_round_trip() {
        let original = hash(&phos(Some("S"), Some("222")));
        let hex = original.to_string();
        assert_eq!(hex.len(), 32);
        assert_eq!(StatementHash::from_hex(&hex), Some(original));
        assert_eq!(StatementHash::from_hex("not hex"), None);
        assert_eq!(StatementHash::from_hex(""), None);
    }

    #[test]
    fn statement_serde_round_trip_preserves_hash() {
        let mut statement = phos(Some("S"), Some("222"))
            .with_evidence(Evidence::new("sparser").with_pmid("12345"));
        statement.supports.insert(StatementHash(99));
        let json = serde_json::to_string(&statement).unwrap();
        let restored: Statement = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, statement);
        assert_eq!(hash(&restored), hash(&statement));
    }

    #[test]
    fn role_table_is_stable_per_shape() {
        let statement = phos(None, None);
        let names: Vec<&str> = statement
            .relation
            .roles()
            .iter()
            .map(|binding| binding.name)
            .collect();
        assert_eq!(names, vec!["enz", "sub"]);

        let complex = Statement::new(Relation::Complex { members: vec![] });
        let names: Vec<&str> = complex
            .relation
            .roles()
            .iter()
            .map(|binding| binding.name)
            .collect();
        assert_eq!(names, vec!["members"]);
    }
}
