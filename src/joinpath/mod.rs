//! Join path enumeration.
//!
//! Given a join relation and one ordering of its two input relations, [`enumerate_join_paths`]
//! generates every nested loop, merge and hash join path worth considering and offers them to
//! the join relation's pool. Callers wanting both orders call it twice with the inputs swapped,
//! see [`populate_join_rel`](crate::joinrels::populate_join_rel).
//!
//! Three builders run in turn, each followed by one dominance sweep of the pool:
//!
//! 1. [`merge::sort_inner_and_outer`]: merge joins over explicitly sorted cheapest inputs.
//! 2. [`unsorted::match_unsorted_outer`]: every outer path as is, joined by nested loop to the
//!    interesting inner paths and by merge join to inners sorted on the outer's order.
//! 3. [`hash::hash_inner_and_outer`]: hash joins of the cheapest inputs.

use std::rc::Rc;

use anyhow::bail;
use enumset::EnumSet;
use log::{debug, trace};

use crate::clause::RestrictClause;
use crate::error::{JoinPathError, OptResult};
use crate::operator::JoinKind;
use crate::optimizer::{JoinMethod, OptimizerContext};
use crate::pathnode::PathFactory;
use crate::plan::PathRef;
use crate::pool::PathPool;
use crate::relation::{RelIds, RelSummary};

pub mod clauses;
pub mod hash;
pub mod merge;
pub mod pathkeys;
pub mod unsorted;

pub use clauses::{classify_clauses, ClassifiedClauses};

/// Everything the builders share during one enumeration call.
pub struct JoinSearch<'a> {
    pub ctx: &'a OptimizerContext,
    pub factory: PathFactory<'a>,
    pub join_relids: RelIds,
    pub outer_rel: &'a RelSummary,
    pub inner_rel: &'a RelSummary,
    pub join_kind: JoinKind,
    pub restrict_list: &'a [Rc<RestrictClause>],
    pub clauses: ClassifiedClauses,
    pub methods: EnumSet<JoinMethod>,
    pub outer_cheapest_startup: &'a PathRef,
    pub outer_cheapest_total: &'a PathRef,
    pub inner_cheapest_startup: &'a PathRef,
    pub inner_cheapest_total: &'a PathRef,
}

impl<'a> JoinSearch<'a> {
    pub fn new(
        ctx: &'a OptimizerContext,
        join_rel: &RelSummary,
        outer_rel: &'a RelSummary,
        inner_rel: &'a RelSummary,
        join_kind: JoinKind,
        restrict_list: &'a [Rc<RestrictClause>],
    ) -> OptResult<Self> {
        if !join_kind.is_supported() {
            bail!(JoinPathError::UnrecognizedJoinKind(join_kind));
        }
        let (outer_cheapest_startup, outer_cheapest_total) = cheapest_paths(outer_rel)?;
        let (inner_cheapest_startup, inner_cheapest_total) = cheapest_paths(inner_rel)?;

        let clauses = classify_clauses(ctx, outer_rel, inner_rel, join_kind, restrict_list)?;
        let methods = ctx.config().effective_join_methods(join_kind);

        Ok(Self {
            ctx,
            factory: PathFactory::new(ctx, join_rel),
            join_relids: join_rel.relids(),
            outer_rel,
            inner_rel,
            join_kind,
            restrict_list,
            clauses,
            methods,
            outer_cheapest_startup,
            outer_cheapest_total,
            inner_cheapest_startup,
            inner_cheapest_total,
        })
    }

    pub fn method_enabled(&self, method: JoinMethod) -> bool {
        self.methods.contains(method)
    }

    /// Hands a candidate from the factory to the pool; refused candidates are dropped.
    pub(crate) fn offer(&self, pool: &mut PathPool, candidate: Option<PathRef>, what: &str) {
        match candidate {
            Some(path) => pool.submit(path),
            None => trace!("No feasible {} path for {}", what, self.join_relids),
        }
    }
}

fn cheapest_paths(rel: &RelSummary) -> OptResult<(&PathRef, &PathRef)> {
    match (rel.cheapest_startup_path(), rel.cheapest_total_path()) {
        (Some(startup), Some(total)) => Ok((startup, total)),
        _ => bail!(
            "relation {} has no cheapest path, call set_cheapest first",
            rel.relids()
        ),
    }
}

/// Generates join paths of `outer_rel` joined to `inner_rel` and offers them to `join_rel`.
///
/// Both inputs must have their cheapest paths set. No surviving candidate is not an error: the
/// caller decides what a relation without paths means. Fails only for join kinds the
/// enumerator can't plan and for full joins on conditions a merge join can't execute.
pub fn enumerate_join_paths(
    ctx: &OptimizerContext,
    join_rel: &mut RelSummary,
    outer_rel: &RelSummary,
    inner_rel: &RelSummary,
    join_kind: JoinKind,
    restrict_list: &[Rc<RestrictClause>],
) -> OptResult<()> {
    let search = JoinSearch::new(ctx, join_rel, outer_rel, inner_rel, join_kind, restrict_list)?;
    debug!(
        "Enumerating {} join of {} and {} with methods {:?}, {} merge, {} hash clauses",
        join_kind,
        outer_rel.relids(),
        inner_rel.relids(),
        search.methods,
        search.clauses.mergeable.len(),
        search.clauses.hashable.len()
    );

    let pool = join_rel.pool_mut();

    if search.method_enabled(JoinMethod::MergeJoin) {
        merge::sort_inner_and_outer(&search, pool)?;
    }
    pool.commit();

    unsorted::match_unsorted_outer(&search, pool)?;
    pool.commit();

    if search.method_enabled(JoinMethod::HashJoin) {
        hash::hash_inner_and_outer(&search, pool);
    }
    pool.commit();

    debug!(
        "Join relation {} has {} paths",
        join_rel.relids(),
        join_rel.paths().len()
    );
    trace!("Surviving paths:\n{}", join_rel.pool().explain());
    Ok(())
}
