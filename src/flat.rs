//! Flat statement records for corpus interchange.
//!
//! The flat form is the serialization boundary of the engine: a
//! self-describing record `{type, roles, scalars, evidence, belief, supports,
//! supported_by}` with support edges as hex content hashes, so a preassembled
//! corpus round-trips through JSON without object references.
//!
//! Record order is meaningful for duplicate groups only: when two records
//! share a content hash, the earlier one becomes the deduplication
//! representative and keeps its evidence first.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::Agent;
use crate::error::{FlatError, KhepriResult};
use crate::statement::{
    Evidence, ModificationKind, Relation, RegulationKind, RoleValue, Statement, StatementHash,
    StatementKind,
};

/// A role's value in a flat record: an agent, an agent list, or null.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlatRole {
    /// Single agent or null.
    One(Option<Agent>),
    /// Agent list for list-valued roles.
    Many(Vec<Agent>),
}

/// Flat, self-describing statement record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatStatement {
    /// Statement type tag, e.g. `"Phosphorylation"` or `"Complex"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Role name → agent, agent list, or null. Omitted roles are absent.
    #[serde(default)]
    pub roles: BTreeMap<String, FlatRole>,
    /// Scalar fields by name. Strings except `is_active`, which is a boolean.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scalars: BTreeMap<String, Value>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default = "default_belief")]
    pub belief: f64,
    /// Hex hashes of the more general statements this one refines.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub supports: BTreeSet<String>,
    /// Hex hashes of the more specific statements refining this one.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub supported_by: BTreeSet<String>,
}

fn default_belief() -> f64 {
    1.0
}

/// Convert a statement into its flat record.
pub fn to_flat(statement: &Statement) -> FlatStatement {
    let relation = &statement.relation;
    let mut roles = BTreeMap::new();
    for binding in relation.roles() {
        let value = match binding.value {
            RoleValue::One(agent) => FlatRole::One(agent.cloned()),
            RoleValue::Many(members) => FlatRole::Many(members.to_vec()),
        };
        roles.insert(binding.name.to_string(), value);
    }

    let mut scalars = BTreeMap::new();
    match relation {
        Relation::ActiveForm {
            activity,
            is_active,
            ..
        } => {
            scalars.insert("activity".to_string(), Value::String(activity.clone()));
            scalars.insert("is_active".to_string(), Value::Bool(*is_active));
        }
        _ => {
            for (name, value) in relation.scalars() {
                if let Some(value) = value {
                    scalars.insert(name.to_string(), Value::String(value));
                }
            }
        }
    }

    FlatStatement {
        kind: statement.kind().to_string(),
        roles,
        scalars,
        evidence: statement.evidence.clone(),
        belief: statement.belief,
        supports: statement.supports.iter().map(|h| h.to_string()).collect(),
        supported_by: statement
            .supported_by
            .iter()
            .map(|h| h.to_string())
            .collect(),
    }
}

/// Parse a flat record back into a statement.
pub fn from_flat(flat: FlatStatement) -> Result<Statement, FlatError> {
    let kind = parse_kind(&flat.kind)?;
    let FlatStatement {
        kind: tag,
        mut roles,
        scalars,
        evidence,
        belief,
        supports,
        supported_by,
    } = flat;

    let relation = match kind {
        StatementKind::Phosphorylation
        | StatementKind::Dephosphorylation
        | StatementKind::Ubiquitination
        | StatementKind::Deubiquitination
        | StatementKind::Acetylation
        | StatementKind::Deacetylation => Relation::Modification {
            kind: modification_kind(kind),
            enz: one_role(&mut roles, "enz", &tag)?,
            sub: one_role(&mut roles, "sub", &tag)?,
            residue: string_scalar(&scalars, "residue", &tag)?,
            position: string_scalar(&scalars, "position", &tag)?,
        },
        StatementKind::Activation | StatementKind::Inhibition => Relation::Regulation {
            kind: if kind == StatementKind::Activation {
                RegulationKind::Activation
            } else {
                RegulationKind::Inhibition
            },
            subj: one_role(&mut roles, "subj", &tag)?,
            obj: one_role(&mut roles, "obj", &tag)?,
        },
        StatementKind::Complex => Relation::Complex {
            members: many_role(&mut roles, "members", &tag)?,
        },
        StatementKind::ActiveForm => Relation::ActiveForm {
            agent: one_role(&mut roles, "agent", &tag)?,
            activity: string_scalar(&scalars, "activity", &tag)?.ok_or_else(|| {
                FlatError::MissingScalar {
                    statement_type: tag.clone(),
                    name: "activity".into(),
                }
            })?,
            is_active: bool_scalar(&scalars, "is_active", &tag)?.ok_or_else(|| {
                FlatError::MissingScalar {
                    statement_type: tag.clone(),
                    name: "is_active".into(),
                }
            })?,
        },
        StatementKind::Translocation => Relation::Translocation {
            agent: one_role(&mut roles, "agent", &tag)?,
            from_location: string_scalar(&scalars, "from_location", &tag)?,
            to_location: string_scalar(&scalars, "to_location", &tag)?,
        },
    };

    Ok(Statement {
        relation,
        evidence,
        belief,
        supports: parse_hashes(supports)?,
        supported_by: parse_hashes(supported_by)?,
    })
}

/// Parse a JSON array of flat records into statements, preserving order.
pub fn corpus_from_json(json: &str) -> KhepriResult<Vec<Statement>> {
    let flats: Vec<FlatStatement> = serde_json::from_str(json).map_err(|e| FlatError::Json {
        message: e.to_string(),
    })?;
    flats
        .into_iter()
        .map(|flat| from_flat(flat).map_err(Into::into))
        .collect()
}

/// Serialize statements as a JSON array of flat records.
pub fn corpus_to_json(statements: &[Statement]) -> KhepriResult<String> {
    let flats: Vec<FlatStatement> = statements.iter().map(to_flat).collect();
    serde_json::to_string_pretty(&flats).map_err(|e| {
        FlatError::Json {
            message: e.to_string(),
        }
        .into()
    })
}

fn parse_kind(tag: &str) -> Result<StatementKind, FlatError> {
    let kind = match tag {
        "Phosphorylation" => StatementKind::Phosphorylation,
        "Dephosphorylation" => StatementKind::Dephosphorylation,
        "Ubiquitination" => StatementKind::Ubiquitination,
        "Deubiquitination" => StatementKind::Deubiquitination,
        "Acetylation" => StatementKind::Acetylation,
        "Deacetylation" => StatementKind::Deacetylation,
        "Activation" => StatementKind::Activation,
        "Inhibition" => StatementKind::Inhibition,
        "Complex" => StatementKind::Complex,
        "ActiveForm" => StatementKind::ActiveForm,
        "Translocation" => StatementKind::Translocation,
        other => {
            return Err(FlatError::UnknownStatementType {
                value: other.to_string(),
            });
        }
    };
    Ok(kind)
}

fn modification_kind(kind: StatementKind) -> ModificationKind {
    match kind {
        StatementKind::Phosphorylation => ModificationKind::Phosphorylation,
        StatementKind::Dephosphorylation => ModificationKind::Dephosphorylation,
        StatementKind::Ubiquitination => ModificationKind::Ubiquitination,
        StatementKind::Deubiquitination => ModificationKind::Deubiquitination,
        StatementKind::Acetylation => ModificationKind::Acetylation,
        StatementKind::Deacetylation => ModificationKind::Deacetylation,
        // Callers only pass modification tags here.
        _ => unreachable!("not a modification kind"),
    }
}

fn one_role(
    roles: &mut BTreeMap<String, FlatRole>,
    name: &str,
    tag: &str,
) -> Result<Option<Agent>, FlatError> {
    match roles.remove(name) {
        None => Ok(None),
        Some(FlatRole::One(agent)) => Ok(agent),
        Some(FlatRole::Many(_)) => Err(FlatError::RoleShape {
            statement_type: tag.to_string(),
            role: name.to_string(),
        }),
    }
}

fn many_role(
    roles: &mut BTreeMap<String, FlatRole>,
    name: &str,
    tag: &str,
) -> Result<Vec<Agent>, FlatError> {
    match roles.remove(name) {
        None => Ok(Vec::new()),
        Some(FlatRole::Many(members)) => Ok(members),
        Some(FlatRole::One(_)) => Err(FlatError::RoleShape {
            statement_type: tag.to_string(),
            role: name.to_string(),
        }),
    }
}

fn string_scalar(
    scalars: &BTreeMap<String, Value>,
    name: &str,
    tag: &str,
) -> Result<Option<String>, FlatError> {
    match scalars.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(FlatError::ScalarType {
            statement_type: tag.to_string(),
            name: name.to_string(),
        }),
    }
}

fn bool_scalar(
    scalars: &BTreeMap<String, Value>,
    name: &str,
    tag: &str,
) -> Result<Option<bool>, FlatError> {
    match scalars.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(_) => Err(FlatError::ScalarType {
            statement_type: tag.to_string(),
            name: name.to_string(),
        }),
    }
}

fn parse_hashes(hex: BTreeSet<String>) -> Result<BTreeSet<StatementHash>, FlatError> {
    hex.into_iter()
        .map(|value| {
            StatementHash::from_hex(&value).ok_or(FlatError::InvalidHash { value })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::DEFAULT_NAMESPACE_PRIORITY;

    fn kras() -> Agent {
        Agent::new("KRAS").with_grounding("HGNC", "6407")
    }

    fn raf() -> Agent {
        Agent::new("RAF1").with_grounding("HGNC", "9829")
    }

    fn round_trip(statement: &Statement) -> Statement {
        let flat = to_flat(statement);
        let json = serde_json::to_string(&flat).unwrap();
        let parsed: FlatStatement = serde_json::from_str(&json).unwrap();
        from_flat(parsed).unwrap()
    }

    #[test]
    fn every_shape_round_trips() {
        let statements = vec![
            Statement::new(Relation::Modification {
                kind: ModificationKind::Phosphorylation,
                enz: Some(kras()),
                sub: Some(raf()),
                residue: Some("S".into()),
                position: Some("338".into()),
            }),
            Statement::new(Relation::Modification {
                kind: ModificationKind::Deacetylation,
                enz: None,
                sub: Some(raf()),
                residue: None,
                position: None,
            }),
            Statement::new(Relation::Regulation {
                kind: RegulationKind::Inhibition,
                subj: Some(kras()),
                obj: Some(raf()),
            }),
            Statement::new(Relation::Complex {
                members: vec![kras(), raf()],
            }),
            Statement::new(Relation::ActiveForm {
                agent: Some(raf()),
                activity: "kinase".into(),
                is_active: true,
            }),
            Statement::new(Relation::Translocation {
                agent: Some(kras()),
                from_location: Some("cytoplasm".into()),
                to_location: Some("plasma membrane".into()),
            }),
        ];
        for statement in statements {
            let restored = round_trip(&statement);
            assert_eq!(restored, statement);
            assert_eq!(
                restored.hash_with(&DEFAULT_NAMESPACE_PRIORITY),
                statement.hash_with(&DEFAULT_NAMESPACE_PRIORITY)
            );
        }
    }

    #[test]
    fn support_sets_round_trip_as_hex() {
        let mut statement = Statement::new(Relation::Complex {
            members: vec![kras()],
        });
        statement.supports.insert(StatementHash(0xdead_beef));
        statement.supported_by.insert(StatementHash(42));
        let restored = round_trip(&statement);
        assert_eq!(restored.supports, statement.supports);
        assert_eq!(restored.supported_by, statement.supported_by);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let flat = FlatStatement {
            kind: "Binding".into(),
            roles: BTreeMap::new(),
            scalars: BTreeMap::new(),
            evidence: vec![],
            belief: 1.0,
            supports: BTreeSet::new(),
            supported_by: BTreeSet::new(),
        };
        assert!(matches!(
            from_flat(flat),
            Err(FlatError::UnknownStatementType { .. })
        ));
    }

    #[test]
    fn wrong_role_shape_is_rejected() {
        let mut roles = BTreeMap::new();
        roles.insert("members".to_string(), FlatRole::One(Some(kras())));
        let flat = FlatStatement {
            kind: "Complex".into(),
            roles,
            scalars: BTreeMap::new(),
            evidence: vec![],
            belief: 1.0,
            supports: BTreeSet::new(),
            supported_by: BTreeSet::new(),
        };
        assert!(matches!(from_flat(flat), Err(FlatError::RoleShape { .. })));
    }

    #[test]
    fn omitted_roles_are_absent() {
        let flat = FlatStatement {
            kind: "Phosphorylation".into(),
            roles: BTreeMap::new(),
            scalars: BTreeMap::new(),
            evidence: vec![],
            belief: 0.5,
            supports: BTreeSet::new(),
            supported_by: BTreeSet::new(),
        };
        let statement = from_flat(flat).unwrap();
        match &statement.relation {
            Relation::Modification { enz, sub, .. } => {
                assert!(enz.is_none());
                assert!(sub.is_none());
            }
            other => panic!("unexpected relation: {other:?}"),
        }
    }

    #[test]
    fn active_form_requires_its_scalars() {
        let flat = FlatStatement {
            kind: "ActiveForm".into(),
            roles: BTreeMap::new(),
            scalars: BTreeMap::new(),
            evidence: vec![],
            belief: 1.0,
            supports: BTreeSet::new(),
            supported_by: BTreeSet::new(),
        };
        assert!(matches!(
            from_flat(flat),
            Err(FlatError::MissingScalar { .. })
        ));
    }

    #[test]
    fn invalid_hash_is_rejected() {
        let flat = FlatStatement {
            kind: "Complex".into(),
            roles: BTreeMap::new(),
            scalars: BTreeMap::new(),
            evidence: vec![],
            belief: 1.0,
            supports: ["zzzz".to_string()].into_iter().collect(),
            supported_by: BTreeSet::new(),
        };
        assert!(matches!(from_flat(flat), Err(FlatError::InvalidHash { .. })));
    }

    #[test]
    fn corpus_json_round_trip() {
        let statements = vec![
            Statement::new(Relation::Complex {
                members: vec![kras(), raf()],
            })
            .with_evidence(Evidence::new("biopax").with_pmid("123")),
            Statement::new(Relation::Regulation {
                kind: RegulationKind::Activation,
                subj: Some(kras()),
                obj: None,
            }),
        ];
        let json = corpus_to_json(&statements).unwrap();
        let restored = corpus_from_json(&json).unwrap();
        assert_eq!(restored, statements);
    }
}
