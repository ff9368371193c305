//! Exact refinement confirmation.
//!
//! The candidate filter over-approximates; this module runs the precise,
//! purely local predicate on each surviving pair. For pairs that came out of
//! the candidate filter, the per-role ontology membership of single-valued
//! roles is already certified (`entities_refined`), so confirmation reduces to
//! scalar comparison plus the bijective member check for list roles, which the
//! coarse filter cannot certify (it only intersects member key sets, it never
//! pairs members up).

use std::collections::{HashMap, HashSet};

use crate::agent::Agent;
use crate::ontology::OntologyClient;
use crate::statement::{RoleValue, Statement, StatementHash};

use super::Direction;

/// Whether `specific` is an exact refinement of `general`.
///
/// Both statements must share a kind; every role of `specific` must refine the
/// corresponding role of `general`, and every scalar `general` specifies must
/// be matched exactly by `specific`. With `entities_refined`, single-valued
/// roles are trusted as certified by the candidate filter and skipped;
/// list-valued roles are always re-checked member-by-member.
pub fn refinement_of<S: AsRef<str>>(
    specific: &Statement,
    general: &Statement,
    ontology: &dyn OntologyClient,
    namespace_priority: &[S],
    entities_refined: bool,
) -> bool {
    if specific.kind() != general.kind() {
        return false;
    }

    let specific_roles = specific.relation.roles();
    let general_roles = general.relation.roles();
    debug_assert_eq!(specific_roles.len(), general_roles.len());

    for (s_role, g_role) in specific_roles.iter().zip(general_roles.iter()) {
        match (s_role.value, g_role.value) {
            (RoleValue::One(s_agent), RoleValue::One(g_agent)) => {
                if !entities_refined
                    && !agent_refines(s_agent, g_agent, ontology, namespace_priority)
                {
                    return false;
                }
            }
            (RoleValue::Many(s_members), RoleValue::Many(g_members)) => {
                if !members_cover(s_members, g_members, ontology, namespace_priority) {
                    return false;
                }
            }
            // Role tables are fixed per kind, so mixed shapes cannot happen
            // for statements that share one.
            _ => return false,
        }
    }

    let specific_scalars = specific.relation.scalars();
    let general_scalars = general.relation.scalars();
    for ((_, s_value), (_, g_value)) in specific_scalars.iter().zip(general_scalars.iter()) {
        if let Some(constraint) = g_value {
            if s_value.as_deref() != Some(constraint.as_str()) {
                return false;
            }
        }
    }

    true
}

/// Whether one optional agent refines another.
///
/// An absent general agent is unconstrained and refined by anything; an absent
/// specific agent refines nothing concrete. Two present agents refine when
/// their keys are equal or the specific key's ancestor closure contains the
/// general key; ungrounded name keys carry no closure and compare by equality
/// only.
pub fn agent_refines<S: AsRef<str>>(
    specific: Option<&Agent>,
    general: Option<&Agent>,
    ontology: &dyn OntologyClient,
    namespace_priority: &[S],
) -> bool {
    match (specific, general) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(s_agent), Some(g_agent)) => {
            let s_key = s_agent.key(namespace_priority);
            let g_key = g_agent.key(namespace_priority);
            if s_key == g_key {
                return true;
            }
            match (s_key.concept(), g_key.concept()) {
                (Some((s_ns, s_id)), Some((g_ns, g_id))) => ontology
                    .ancestors(s_ns, s_id)
                    .contains(&(g_ns.to_string(), g_id.to_string())),
                _ => false,
            }
        }
    }
}

/// Bijective covering check for list-valued roles.
///
/// An empty general member list is unconstrained. Otherwise the lists must
/// have equal length and admit a perfect pairing in which each general member
/// is refined by a distinct specific member.
fn members_cover<S: AsRef<str>>(
    specific: &[Agent],
    general: &[Agent],
    ontology: &dyn OntologyClient,
    namespace_priority: &[S],
) -> bool {
    if general.is_empty() {
        return true;
    }
    if specific.len() != general.len() {
        return false;
    }
    let compat: Vec<Vec<bool>> = general
        .iter()
        .map(|g_member| {
            specific
                .iter()
                .map(|s_member| {
                    agent_refines(Some(s_member), Some(g_member), ontology, namespace_priority)
                })
                .collect()
        })
        .collect();
    bijection_exists(&compat)
}

/// Backtracking search for a perfect matching in a compatibility matrix.
///
/// `compat[g][s]` marks that general member `g` can be covered by specific
/// member `s`. Complexes are small, so exhaustive backtracking is fine.
fn bijection_exists(compat: &[Vec<bool>]) -> bool {
    fn assign(compat: &[Vec<bool>], g: usize, used: &mut [bool]) -> bool {
        if g == compat.len() {
            return true;
        }
        for s in 0..used.len() {
            if compat[g][s] && !used[s] {
                used[s] = true;
                if assign(compat, g + 1, used) {
                    return true;
                }
                used[s] = false;
            }
        }
        false
    }
    let width = compat.first().map(|row| row.len()).unwrap_or(0);
    let mut used = vec![false; width];
    assign(compat, 0, &mut used)
}

/// Keep the candidates for which the exact predicate holds.
///
/// Candidates absent from the corpus map are silently dropped; a stale hash
/// can only cost a missed refinement, never an error.
pub fn confirm_candidates<S: AsRef<str>>(
    statement: &Statement,
    candidates: &HashSet<StatementHash>,
    direction: Direction,
    corpus: &HashMap<StatementHash, &Statement>,
    ontology: &dyn OntologyClient,
    namespace_priority: &[S],
) -> HashSet<StatementHash> {
    candidates
        .iter()
        .copied()
        .filter(|candidate_hash| {
            let Some(candidate) = corpus.get(candidate_hash) else {
                return false;
            };
            match direction {
                Direction::LessSpecific => {
                    refinement_of(statement, candidate, ontology, namespace_priority, true)
                }
                Direction::MoreSpecific => {
                    refinement_of(candidate, statement, ontology, namespace_priority, true)
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::DEFAULT_NAMESPACE_PRIORITY;
    use crate::ontology::{EdgeKind, InMemoryOntology};
    use crate::statement::{ModificationKind, Relation};

    fn ontology() -> InMemoryOntology {
        let ontology = InMemoryOntology::new();
        ontology
            .add_edge("HGNC", "6407", "FPLX", "RAS", EdgeKind::IsA)
            .unwrap();
        ontology
            .add_edge("HGNC", "5173", "FPLX", "RAS", EdgeKind::IsA)
            .unwrap();
        ontology
    }

    fn kras() -> Agent {
        Agent::new("KRAS").with_grounding("HGNC", "6407")
    }

    fn hras() -> Agent {
        Agent::new("HRAS").with_grounding("HGNC", "5173")
    }

    fn ras() -> Agent {
        Agent::new("RAS").with_grounding("FPLX", "RAS")
    }

    fn tp53() -> Agent {
        Agent::new("TP53").with_grounding("HGNC", "11998")
    }

    fn phos(enz: Option<Agent>, residue: Option<&str>, position: Option<&str>) -> Statement {
        Statement::new(Relation::Modification {
            kind: ModificationKind::Phosphorylation,
            enz,
            sub: Some(tp53()),
            residue: residue.map(String::from),
            position: position.map(String::from),
        })
    }

    fn refines(specific: &Statement, general: &Statement, ontology: &InMemoryOntology) -> bool {
        refinement_of(
            specific,
            general,
            ontology,
            &DEFAULT_NAMESPACE_PRIORITY,
            false,
        )
    }

    #[test]
    fn member_refines_family() {
        let ontology = ontology();
        let specific = phos(Some(kras()), None, None);
        let general = phos(Some(ras()), None, None);
        assert!(refines(&specific, &general, &ontology));
        // Antisymmetry: a family never refines its member.
        assert!(!refines(&general, &specific, &ontology));
    }

    #[test]
    fn specified_site_refines_unspecified() {
        let ontology = ontology();
        let unspecified = phos(Some(kras()), None, None);
        let site = phos(Some(kras()), Some("S"), Some("222"));
        assert!(refines(&site, &unspecified, &ontology));
        assert!(!refines(&unspecified, &site, &ontology));
    }

    #[test]
    fn different_sites_are_unrelated() {
        let ontology = ontology();
        let serine = phos(Some(kras()), Some("S"), Some("222"));
        let threonine = phos(Some(kras()), Some("T"), Some("222"));
        assert!(!refines(&serine, &threonine, &ontology));
        assert!(!refines(&threonine, &serine, &ontology));
    }

    #[test]
    fn concrete_enzyme_refines_absent_enzyme() {
        let ontology = ontology();
        let unknown_catalyst = phos(None, None, None);
        let known = phos(Some(kras()), None, None);
        assert!(refines(&known, &unknown_catalyst, &ontology));
        assert!(!refines(&unknown_catalyst, &known, &ontology));
    }

    #[test]
    fn complex_members_pair_bijectively() {
        let ontology = ontology();
        let family_dimer = Statement::new(Relation::Complex {
            members: vec![ras(), ras()],
        });
        let concrete_dimer = Statement::new(Relation::Complex {
            members: vec![kras(), hras()],
        });
        assert!(refines(&concrete_dimer, &family_dimer, &ontology));

        // Two copies of one member cannot both cover distinct generals.
        let mixed = Statement::new(Relation::Complex {
            members: vec![ras(), tp53()],
        });
        let doubled = Statement::new(Relation::Complex {
            members: vec![kras(), kras()],
        });
        assert!(!refines(&doubled, &mixed, &ontology));
    }

    #[test]
    fn complex_length_mismatch_never_refines() {
        let ontology = ontology();
        let pair = Statement::new(Relation::Complex {
            members: vec![ras(), tp53()],
        });
        let single = Statement::new(Relation::Complex {
            members: vec![kras()],
        });
        assert!(!refines(&single, &pair, &ontology));
    }

    #[test]
    fn empty_complex_is_refined_by_any_complex() {
        let ontology = ontology();
        let empty = Statement::new(Relation::Complex { members: vec![] });
        let concrete = Statement::new(Relation::Complex {
            members: vec![kras(), tp53()],
        });
        assert!(refines(&concrete, &empty, &ontology));
        assert!(!refines(&empty, &concrete, &ontology));
    }

    #[test]
    fn kinds_never_mix() {
        let ontology = ontology();
        let modification = phos(Some(kras()), None, None);
        let complex = Statement::new(Relation::Complex {
            members: vec![kras(), tp53()],
        });
        assert!(!refines(&modification, &complex, &ontology));
        assert!(!refines(&complex, &modification, &ontology));
    }

    #[test]
    fn certified_pairs_still_compare_scalars() {
        let ontology = ontology();
        let serine = phos(Some(kras()), Some("S"), Some("222"));
        let threonine = phos(Some(kras()), Some("T"), Some("222"));
        // Even with entities certified, mismatched scalars must veto.
        assert!(!refinement_of(
            &serine,
            &threonine,
            &ontology,
            &DEFAULT_NAMESPACE_PRIORITY,
            true,
        ));
    }

    #[test]
    fn confirm_filters_candidates_against_corpus() {
        let ontology = ontology();
        let specific = phos(Some(kras()), Some("S"), Some("222"));
        let general = phos(Some(ras()), None, None);
        let sibling = phos(Some(ras()), Some("T"), Some("185"));

        let hash = |s: &Statement| s.hash_with(&DEFAULT_NAMESPACE_PRIORITY);
        let corpus: HashMap<StatementHash, &Statement> =
            [(hash(&general), &general), (hash(&sibling), &sibling)]
                .into_iter()
                .collect();
        // What the coarse filter would emit: both share compatible role keys,
        // plus a stale hash that fell out of the corpus.
        let candidates: HashSet<StatementHash> =
            [hash(&general), hash(&sibling), StatementHash(424242)]
                .into_iter()
                .collect();

        let confirmed = confirm_candidates(
            &specific,
            &candidates,
            Direction::LessSpecific,
            &corpus,
            &ontology,
            &DEFAULT_NAMESPACE_PRIORITY,
        );
        // The sibling's mismatched site vetoes it; the stale hash is dropped,
        // not an error.
        let expected: HashSet<StatementHash> = [hash(&general)].into_iter().collect();
        assert_eq!(confirmed, expected);
    }
}
