//! Hash joins.

use std::rc::Rc;

use log::debug;

use crate::joinpath::JoinSearch;
use crate::optimizer::OptimizerContext;
use crate::plan::{Path, PathRef};
use crate::pool::PathPool;

/// Bytes one segment holds of `path`'s output.
fn memory_per_segment(ctx: &OptimizerContext, path: &Path) -> f64 {
    path.width() as f64
        * path
            .distribution()
            .rows_per_segment(path.rows(), ctx.num_segments())
}

/// Whether a hash join builds on its smaller side, comparing the inputs after any motion.
pub fn passes_size_heuristic(ctx: &OptimizerContext, hash_path: &Path) -> bool {
    match hash_path.join_inputs() {
        Some((outer, inner)) => {
            memory_per_segment(ctx, outer)
                >= ctx.config().hashjoin_size_ratio * memory_per_segment(ctx, inner)
        }
        None => true,
    }
}

/// Hashes the cheapest-total inner and probes it with the cheapest outer paths.
///
/// The build reads the whole inner before the first probe, so only the cheapest-total inner is
/// tried.
pub fn hash_inner_and_outer(search: &JoinSearch, pool: &mut PathPool) {
    let hash_clauses = &search.clauses.hashable;
    if hash_clauses.is_empty() {
        return;
    }

    let mut outers: Vec<&PathRef> = vec![search.outer_cheapest_total];
    if !Rc::ptr_eq(search.outer_cheapest_startup, search.outer_cheapest_total) {
        outers.push(search.outer_cheapest_startup);
    }
    let check_size = search
        .ctx
        .config()
        .applies_hashjoin_size_heuristic(search.join_kind);

    for outer in outers {
        let candidate = search.factory.make_hash(
            search.join_kind,
            outer,
            search.inner_cheapest_total,
            search.restrict_list,
            &search.clauses.redistribution,
            hash_clauses,
        );
        match candidate {
            Some(path) if check_size && !passes_size_heuristic(search.ctx, &path) => {
                debug!("Hash join {} builds on its larger input, skipped", path);
            }
            candidate => search.offer(pool, candidate, "hash"),
        }
    }
}
