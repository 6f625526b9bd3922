//! Merge joins that sort both inputs.

use anyhow::ensure;
use itertools::Itertools;
use log::trace;

use crate::clause::ClauseSide;
use crate::error::OptResult;
use crate::joinpath::pathkeys::{
    build_join_pathkeys, find_mergeclauses_for_pathkeys, make_inner_pathkeys_for_merge,
    select_outer_pathkeys_for_merge,
};
use crate::joinpath::JoinSearch;
use crate::optimizer::JoinMethod;
use crate::pool::PathPool;
use crate::properties::PathKeys;

/// Outer orderings worth sorting into: the canonical one, then each key rotated to the front.
fn candidate_orderings(canonical: PathKeys, with_rotations: bool) -> Vec<PathKeys> {
    let rotations = if with_rotations {
        canonical.len()
    } else {
        canonical.len().min(1)
    };
    (0..rotations)
        .map(|idx| canonical.rotated_to_front(idx))
        .unique()
        .collect()
}

/// Joins the cheapest-total paths of both inputs with a merge join over explicit sorts, once per
/// candidate ordering of the merge keys.
///
/// Only the cheapest-total inputs are worth sorting: a sort reads its whole input before
/// returning a row, so a cheap startup buys nothing.
pub fn sort_inner_and_outer(search: &JoinSearch, pool: &mut PathPool) -> OptResult<()> {
    let merge_clauses = &search.clauses.mergeable;
    if merge_clauses.is_empty() {
        return Ok(());
    }

    let canonical = select_outer_pathkeys_for_merge(search.ctx, merge_clauses, search.join_relids);
    let orderings =
        candidate_orderings(canonical, search.ctx.config().mergejoin_key_rotations);
    trace!("Sorting both inputs into {} orderings", orderings.len());

    for outer_keys in orderings {
        let cur_clauses =
            find_mergeclauses_for_pathkeys(&outer_keys, ClauseSide::Outer, true, merge_clauses);
        ensure!(
            cur_clauses.len() == merge_clauses.len(),
            "outer ordering {} doesn't cover every merge clause",
            outer_keys
        );
        let inner_keys = make_inner_pathkeys_for_merge(&cur_clauses, &outer_keys)?;
        let merge_pathkeys = build_join_pathkeys(
            search.ctx,
            search.outer_rel,
            search.join_kind,
            JoinMethod::MergeJoin,
            &outer_keys,
        );

        let candidate = search.factory.make_merge(
            search.join_kind,
            search.outer_cheapest_total,
            search.inner_cheapest_total,
            search.restrict_list,
            &cur_clauses,
            &search.clauses.redistribution,
            &merge_pathkeys,
            &outer_keys,
            &inner_keys,
        );
        search.offer(pool, candidate, "sorted merge");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::PathKey;

    fn ecs(keys: &PathKeys) -> Vec<usize> {
        keys.iter().map(PathKey::ec).collect()
    }

    #[test]
    fn test_rotations() {
        let canonical: PathKeys = (0..3).map(PathKey::asc).collect();

        let orderings = candidate_orderings(canonical.clone(), true);
        assert_eq!(
            vec![vec![0, 1, 2], vec![1, 0, 2], vec![2, 0, 1]],
            orderings.iter().map(ecs).collect::<Vec<_>>()
        );

        assert_eq!(1, candidate_orderings(canonical, false).len());
    }

    #[test]
    fn test_single_key_has_one_ordering() {
        let canonical: PathKeys = [PathKey::asc(4)].into_iter().collect();
        assert_eq!(1, candidate_orderings(canonical, true).len());
    }
}
