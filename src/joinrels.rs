//! Populating a join relation from a pair of input relations.

use std::rc::Rc;

use log::debug;

use crate::clause::RestrictClause;
use crate::error::OptResult;
use crate::joinpath::enumerate_join_paths;
use crate::operator::JoinKind;
use crate::optimizer::OptimizerContext;
use crate::relation::RelSummary;

/// Enumerates `rel1 join_kind rel2` in both input orders when the join kind allows it, then
/// refreshes the join relation's cheapest paths.
///
/// Returns whether the join relation ended up with any path.
pub fn populate_join_rel(
    ctx: &OptimizerContext,
    join_rel: &mut RelSummary,
    rel1: &RelSummary,
    rel2: &RelSummary,
    join_kind: JoinKind,
    restrict_list: &[Rc<RestrictClause>],
) -> OptResult<bool> {
    enumerate_join_paths(ctx, join_rel, rel1, rel2, join_kind, restrict_list)?;
    if let Some(commuted) = join_kind.commute() {
        enumerate_join_paths(ctx, join_rel, rel2, rel1, commuted, restrict_list)?;
    }

    let has_paths = join_rel.set_cheapest();
    debug!(
        "Populated {} with {} paths",
        join_rel.relids(),
        join_rel.paths().len()
    );
    Ok(has_paths)
}
