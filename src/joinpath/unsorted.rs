//! Joins that take each outer path as it comes.
//!
//! For every outer path this builder tries nested loops against the few interesting inner
//! paths, then merge joins that exploit whatever order the outer path already has. The inner of
//! such a merge join is either the cheapest-total inner sorted to match, or an inner path
//! presorted on the match or on a prefix of it.

use std::cmp::Ordering;
use std::rc::Rc;

use log::trace;

use crate::clause::{ClauseSide, OrientedClause};
use crate::error::OptResult;
use crate::joinpath::pathkeys::{
    build_join_pathkeys, find_mergeclauses_for_pathkeys, make_inner_pathkeys_for_merge,
};
use crate::joinpath::JoinSearch;
use crate::operator::{JoinKind, PathOperatorTrait};
use crate::optimizer::JoinMethod;
use crate::pathnode::PathFactory;
use crate::plan::PathRef;
use crate::pool::{compare_path_costs, CostCriterion, PathPool};
use crate::properties::PathKeys;
use crate::relation::{RelKind, RelSummary, RteKind};

fn is_unique(path: &PathRef) -> bool {
    path.operator().as_unique().is_some()
}

fn is_append(path: &PathRef) -> bool {
    path.operator().as_append().is_some()
}

/// An append with no members: a relation proven empty.
fn is_dummy(path: &PathRef) -> bool {
    is_append(path) && path.inputs().is_empty()
}

/// Cheapest index scans of `inner_rel` whose parameters the outer relation can supply.
///
/// Returns the cheapest-total scan and, when it is a different path, the cheapest-startup one.
pub fn best_inner_indexscan(
    inner_rel: &RelSummary,
    outer_rel: &RelSummary,
) -> (Option<PathRef>, Option<PathRef>) {
    let usable = || {
        inner_rel
            .index_paths()
            .iter()
            .filter(|p| p.param_relids().is_subset(outer_rel.relids()))
    };
    let total = usable().min_by(|a, b| compare_path_costs(a, b, CostCriterion::Total));
    let startup = usable()
        .min_by(|a, b| compare_path_costs(a, b, CostCriterion::Startup))
        .filter(|startup| total.map_or(true, |total| !Rc::ptr_eq(startup, total)));
    (total.cloned(), startup.cloned())
}

/// Inner index path for an appendrel: an append of each member's best parameterized index scan.
///
/// Members without a usable index contribute their cheapest-total path. Returns `None` when no
/// member has a usable index.
pub fn best_appendrel_indexscan(
    factory: &PathFactory,
    inner_rel: &RelSummary,
    outer_rel: &RelSummary,
) -> Option<PathRef> {
    let mut found_indexscan = false;
    let mut members = vec![];

    for child in inner_rel.children() {
        let child_total = match child.cheapest_total_path() {
            Some(path) if !is_dummy(path) => path,
            _ => continue,
        };
        match best_inner_indexscan(child, outer_rel).0 {
            Some(index) => {
                found_indexscan = true;
                members.push(index);
            }
            None => members.push(child_total.clone()),
        }
    }

    if !found_indexscan {
        return None;
    }
    Some(factory.make_append(inner_rel, members))
}

/// Inner paths a nested loop tries against every outer path.
fn nestloop_inners(search: &JoinSearch) -> Vec<PathRef> {
    let inner_total = search.inner_cheapest_total;
    let inner_startup = search.inner_cheapest_startup;
    let mut inners = vec![inner_total.clone()];

    if !inner_total.operator().cheaply_rescannable() {
        inners.push(search.factory.make_material(inner_total));
    }
    if !Rc::ptr_eq(inner_startup, inner_total) {
        inners.push(inner_startup.clone());
    }

    let (index_total, index_startup) = if search.inner_rel.kind() == RelKind::Join {
        (None, None)
    } else if is_append(inner_total) && !search.inner_rel.children().is_empty() {
        (
            best_appendrel_indexscan(&search.factory, search.inner_rel, search.outer_rel),
            None,
        )
    } else if search.inner_rel.rte_kind() == RteKind::Relation {
        best_inner_indexscan(search.inner_rel, search.outer_rel)
    } else {
        (None, None)
    };
    inners.extend(index_total);
    inners.extend(index_startup);
    inners
}

/// Tries nested loops and merge joins for every path of the outer relation.
pub fn match_unsorted_outer(search: &JoinSearch, pool: &mut PathPool) -> OptResult<()> {
    let nestloop_ok = search.method_enabled(JoinMethod::NestLoop);
    let merge_ok = search.method_enabled(JoinMethod::MergeJoin);
    let use_all_clauses = search.join_kind.requires_all_merge_clauses();

    let inners = if nestloop_ok {
        nestloop_inners(search)
    } else {
        vec![]
    };
    trace!(
        "Unsorted outer sweep over {} outer paths, {} nested loop inners",
        search.outer_rel.paths().len(),
        inners.len()
    );

    for outer in search.outer_rel.paths() {
        // Unique-ified outers are planned by the caller's rewritten join.
        if is_unique(outer) {
            continue;
        }

        if nestloop_ok {
            let pathkeys = build_join_pathkeys(
                search.ctx,
                search.outer_rel,
                search.join_kind,
                JoinMethod::NestLoop,
                outer.pathkeys(),
            );
            for inner in &inners {
                let candidate = search.factory.make_nested_loop(
                    search.join_kind,
                    outer,
                    inner,
                    search.restrict_list,
                    &search.clauses.redistribution,
                    &pathkeys,
                );
                search.offer(pool, candidate, "nested loop");
            }
        }

        if merge_ok {
            merge_presorted_outer(search, pool, outer, use_all_clauses)?;
        }
    }
    Ok(())
}

/// Merge joins using the order `outer` already has.
fn merge_presorted_outer(
    search: &JoinSearch,
    pool: &mut PathPool,
    outer: &PathRef,
    use_all_clauses: bool,
) -> OptResult<()> {
    let all_clauses = &search.clauses.mergeable;
    let merge_clauses = find_mergeclauses_for_pathkeys(
        outer.pathkeys(),
        ClauseSide::Outer,
        use_all_clauses,
        all_clauses,
    );
    // A full join has no other method, so `ON true` gets a clauseless merge join.
    if merge_clauses.is_empty() && search.join_kind != JoinKind::Full {
        return Ok(());
    }
    if use_all_clauses && merge_clauses.len() != all_clauses.len() {
        return Ok(());
    }

    let inner_sort_keys = make_inner_pathkeys_for_merge(&merge_clauses, outer.pathkeys())?;
    let merge_pathkeys = build_join_pathkeys(
        search.ctx,
        search.outer_rel,
        search.join_kind,
        JoinMethod::MergeJoin,
        outer.pathkeys(),
    );
    let make_merge = |inner: &PathRef, clauses: &[OrientedClause], inner_keys: &PathKeys| {
        search.factory.make_merge(
            search.join_kind,
            outer,
            inner,
            search.restrict_list,
            clauses,
            &search.clauses.redistribution,
            &merge_pathkeys,
            &PathKeys::empty(),
            inner_keys,
        )
    };

    let inner_total = search.inner_cheapest_total;
    search.offer(
        pool,
        make_merge(inner_total, &merge_clauses, &inner_sort_keys),
        "merge with sorted inner",
    );

    if is_unique(inner_total) {
        return Ok(());
    }

    // Look for inners already sorted on the keys, or on a prefix of them when the join may
    // leave some merge clauses to the join filter.
    let num_sortkeys = inner_sort_keys.len();
    let mut cheapest_total_inner: Option<PathRef> = None;
    let mut cheapest_startup_inner: Option<PathRef> = None;

    for sortkey_count in (1..=num_sortkeys).rev() {
        if use_all_clauses && sortkey_count < num_sortkeys {
            break;
        }
        let mut trial_keys = inner_sort_keys.clone();
        trial_keys.truncate(sortkey_count);
        let truncated = sortkey_count < num_sortkeys;
        let mut new_clauses: Option<Vec<OrientedClause>> = None;
        let mut clauses_for_trial = || {
            new_clauses
                .get_or_insert_with(|| {
                    if truncated {
                        find_mergeclauses_for_pathkeys(
                            &trial_keys,
                            ClauseSide::Inner,
                            false,
                            &merge_clauses,
                        )
                    } else {
                        merge_clauses.clone()
                    }
                })
                .clone()
        };
        let is_new_find = |inner: &PathRef| truncated || !Rc::ptr_eq(inner, inner_total);
        let inner_pool = search.inner_rel.pool();

        if let Some(inner) = inner_pool.cheapest_for_pathkeys(&trial_keys, CostCriterion::Total) {
            let cheaper = cheapest_total_inner.as_ref().map_or(true, |prev| {
                compare_path_costs(inner, prev, CostCriterion::Total) == Ordering::Less
            });
            if is_new_find(inner) && cheaper {
                let clauses = clauses_for_trial();
                search.offer(
                    pool,
                    make_merge(inner, &clauses, &PathKeys::empty()),
                    "merge with presorted inner",
                );
                cheapest_total_inner = Some(inner.clone());
            }
        }

        if let Some(inner) = inner_pool.cheapest_for_pathkeys(&trial_keys, CostCriterion::Startup) {
            let cheaper = cheapest_startup_inner.as_ref().map_or(true, |prev| {
                compare_path_costs(inner, prev, CostCriterion::Startup) == Ordering::Less
            });
            if is_new_find(inner) && cheaper {
                let already_joined = cheapest_total_inner
                    .as_ref()
                    .map_or(false, |total| Rc::ptr_eq(total, inner));
                if !already_joined {
                    let clauses = clauses_for_trial();
                    search.offer(
                        pool,
                        make_merge(inner, &clauses, &PathKeys::empty()),
                        "merge with presorted inner",
                    );
                }
                cheapest_startup_inner = Some(inner.clone());
            }
        }
    }
    Ok(())
}
