//! Pathkey bookkeeping for merge joins.

use anyhow::bail;
use itertools::Itertools;

use crate::clause::{ClauseSide, OrientedClause};
use crate::error::{JoinPathError, OptResult};
use crate::operator::JoinKind;
use crate::optimizer::{JoinMethod, OptimizerContext};
use crate::properties::{EcId, PathKey, PathKeys};
use crate::relation::{RelIds, RelSummary};

struct MergeKeyScore {
    ec: EcId,
    future_partners: usize,
    selectivity: f64,
}

/// Picks the outer sort order for a merge join that sorts both inputs.
///
/// Every distinct outer eclass of `merge_clauses` appears once. Keys matching a prefix of the
/// query's requested ordering come first, in the query's direction. The rest follow, those with
/// more join partners left above `join_relids` first, then the most selective clause, then
/// clause order.
pub fn select_outer_pathkeys_for_merge(
    ctx: &OptimizerContext,
    merge_clauses: &[OrientedClause],
    join_relids: RelIds,
) -> PathKeys {
    let mut scores: Vec<MergeKeyScore> = vec![];
    for clause in merge_clauses {
        let ec = match clause.outer_ec() {
            Some(ec) => ec,
            None => continue,
        };
        let selectivity = clause.clause().selectivity();
        match scores.iter_mut().find(|s| s.ec == ec) {
            Some(score) => score.selectivity = score.selectivity.min(selectivity),
            None => scores.push(MergeKeyScore {
                ec,
                future_partners: ctx
                    .eclass(ec)
                    .map_or(0, |eclass| eclass.future_join_partners(join_relids)),
                selectivity,
            }),
        }
    }

    let mut pathkeys = PathKeys::empty();
    for key in ctx.query_pathkeys() {
        if pathkeys.contains_ec(key.ec()) {
            continue;
        }
        if !scores.iter().any(|s| s.ec == key.ec()) {
            break;
        }
        pathkeys.push(*key);
    }

    scores
        .into_iter()
        .filter(|s| !pathkeys.contains_ec(s.ec))
        .sorted_by(|a, b| {
            b.future_partners
                .cmp(&a.future_partners)
                .then(a.selectivity.total_cmp(&b.selectivity))
        })
        .for_each(|s| pathkeys.push(PathKey::asc(s.ec)));
    pathkeys
}

/// Builds the inner sort order matching `outer_pathkeys` through `merge_clauses`.
///
/// The clauses must be in the order [`find_mergeclauses_for_pathkeys`] returned them for
/// `outer_pathkeys`.
pub fn make_inner_pathkeys_for_merge(
    merge_clauses: &[OrientedClause],
    outer_pathkeys: &PathKeys,
) -> OptResult<PathKeys> {
    let mut outer_keys = outer_pathkeys.iter();
    let mut current: Option<&PathKey> = None;
    let mut inner_pathkeys = PathKeys::empty();

    for clause in merge_clauses {
        let (outer_ec, inner_ec) = match (clause.outer_ec(), clause.inner_ec()) {
            (Some(outer_ec), Some(inner_ec)) => (outer_ec, inner_ec),
            _ => bail!(JoinPathError::PathKeyMismatch),
        };
        // Several clauses may share one outer key.
        if current.map(PathKey::ec) != Some(outer_ec) {
            current = outer_keys.next();
        }
        let outer_key = match current {
            Some(key) if key.ec() == outer_ec => key,
            _ => bail!(JoinPathError::PathKeyMismatch),
        };
        if !inner_pathkeys.contains_ec(inner_ec) {
            inner_pathkeys.push(outer_key.with_ec(inner_ec));
        }
    }

    Ok(inner_pathkeys)
}

/// Merge clauses usable with an input sorted by `pathkeys` on `side`, in key order.
///
/// Stops at the first key no clause matches. With `require_all`, returns nothing unless every
/// clause found a key.
pub fn find_mergeclauses_for_pathkeys(
    pathkeys: &PathKeys,
    side: ClauseSide,
    require_all: bool,
    clauses: &[OrientedClause],
) -> Vec<OrientedClause> {
    let mut found = vec![];
    for key in pathkeys {
        let before = found.len();
        found.extend(
            clauses
                .iter()
                .filter(|c| c.ec_on(side) == Some(key.ec()))
                .cloned(),
        );
        if found.len() == before {
            break;
        }
    }

    if require_all && found.len() != clauses.len() {
        return vec![];
    }
    found
}

/// Sort order of a join's output given the order of its outer input.
pub fn build_join_pathkeys(
    ctx: &OptimizerContext,
    outer_rel: &RelSummary,
    join_kind: JoinKind,
    method: JoinMethod,
    outer_pathkeys: &PathKeys,
) -> PathKeys {
    // Null extended rows come out wherever the merge finds them.
    if join_kind == JoinKind::Full {
        return PathKeys::empty();
    }

    match method {
        JoinMethod::NestLoop => outer_pathkeys.clone(),
        JoinMethod::MergeJoin => outer_pathkeys
            .iter()
            .take_while(|key| {
                ctx.eclass(key.ec())
                    .map_or(false, |eclass| eclass.has_member_within(outer_rel.relids()))
            })
            .copied()
            .collect(),
        JoinMethod::HashJoin => PathKeys::empty(),
    }
}
