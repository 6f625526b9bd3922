//! Classifies the restriction clauses of one join into merge, hash and redistribution keys.

use std::rc::Rc;

use anyhow::bail;
use log::trace;

use crate::clause::{OrientedClause, RestrictClause};
use crate::error::{JoinPathError, OptResult};
use crate::operator::JoinKind;
use crate::optimizer::OptimizerContext;
use crate::relation::RelSummary;

/// Clauses usable as keys of the join between one particular outer and inner relation.
#[derive(Clone, Debug, Default)]
pub struct ClassifiedClauses {
    pub mergeable: Vec<OrientedClause>,
    pub hashable: Vec<OrientedClause>,
    /// Mergeable clauses that can also drive a redistribute motion.
    pub redistribution: Vec<OrientedClause>,
    /// Some clause was not mergeable for a reason other than being pushed down into an outer join.
    pub has_nonmergeable: bool,
}

enum MergeVerdict {
    Mergeable(OrientedClause),
    /// Pushed down into an outer join; becomes a filter, not a join qual.
    Ignored,
    NotMergeable,
}

fn eclass_is_redundant(ctx: &OptimizerContext, ec: Option<usize>) -> bool {
    match ec.and_then(|ec| ctx.eclass(ec)) {
        Some(eclass) => eclass.must_be_redundant(),
        // Clauses without cached eclasses can't be placed in a canonical pathkey list.
        None => true,
    }
}

fn judge_mergeable(
    ctx: &OptimizerContext,
    clause: &Rc<RestrictClause>,
    outer_rel: &RelSummary,
    inner_rel: &RelSummary,
    join_kind: JoinKind,
) -> MergeVerdict {
    if join_kind.is_outer() && clause.is_pushed_down() {
        return MergeVerdict::Ignored;
    }
    if !clause.can_join() || !clause.is_mergeable() {
        return MergeVerdict::NotMergeable;
    }
    let outer_is_left = match clause.orientation(outer_rel, inner_rel) {
        Some(outer_is_left) => outer_is_left,
        None => return MergeVerdict::NotMergeable,
    };
    // Redundant eclasses can't appear in canonical sort orders, so no pathkey could carry them.
    if eclass_is_redundant(ctx, clause.left_ec()) || eclass_is_redundant(ctx, clause.right_ec()) {
        return MergeVerdict::NotMergeable;
    }
    MergeVerdict::Mergeable(OrientedClause::new(clause.clone(), outer_is_left))
}

fn hashable_clause(
    clause: &Rc<RestrictClause>,
    outer_rel: &RelSummary,
    inner_rel: &RelSummary,
    join_kind: JoinKind,
) -> Option<OrientedClause> {
    if !clause.can_join() || clause.hash_operator().is_none() {
        return None;
    }
    // "(a = b) IS NOT FALSE" hashes like "a = b"; only the NOT IN hash join treats its nulls
    // correctly.
    if clause.is_not_false_test() && join_kind != JoinKind::LeftAntiSemiNotIn {
        return None;
    }
    if join_kind.is_outer() && clause.is_pushed_down() {
        return None;
    }
    clause
        .orientation(outer_rel, inner_rel)
        .map(|outer_is_left| OrientedClause::new(clause.clone(), outer_is_left))
}

/// Partitions `restrict_list` for a join of `outer_rel` and `inner_rel`.
///
/// Right and full joins must use every join clause as a merge key. A right join that can't
/// gets no merge clauses; a full join has no other way to run and fails with
/// [`JoinPathError::FullJoinNotMergeable`].
pub fn classify_clauses(
    ctx: &OptimizerContext,
    outer_rel: &RelSummary,
    inner_rel: &RelSummary,
    join_kind: JoinKind,
    restrict_list: &[Rc<RestrictClause>],
) -> OptResult<ClassifiedClauses> {
    let mut result = ClassifiedClauses::default();
    let mut redistribution_has_nonmergeable = false;
    let collect_hash_clauses = matches!(
        join_kind,
        JoinKind::Inner | JoinKind::Left | JoinKind::LeftAntiSemi | JoinKind::LeftAntiSemiNotIn
    );

    for clause in restrict_list {
        match judge_mergeable(ctx, clause, outer_rel, inner_rel, join_kind) {
            MergeVerdict::Mergeable(oriented) => {
                if clause.is_redistributable() {
                    result.redistribution.push(oriented.clone());
                }
                result.mergeable.push(oriented);
            }
            MergeVerdict::Ignored => {}
            MergeVerdict::NotMergeable => {
                trace!("Clause {} is not mergejoinable here", clause);
                result.has_nonmergeable = true;
                redistribution_has_nonmergeable |= clause.is_redistributable();
            }
        }

        if collect_hash_clauses {
            if let Some(oriented) = hashable_clause(clause, outer_rel, inner_rel, join_kind) {
                result.hashable.push(oriented);
            }
        }
    }

    if result.has_nonmergeable {
        match join_kind {
            JoinKind::Right => {
                result.mergeable.clear();
                if redistribution_has_nonmergeable {
                    result.redistribution.clear();
                }
            }
            JoinKind::Full => bail!(JoinPathError::FullJoinNotMergeable),
            _ => {}
        }
    }

    Ok(result)
}
