#![allow(dead_code)]

use std::rc::Rc;

use mpp_joinpath::clause::RestrictClause;
use mpp_joinpath::cost::PathCosts;
use mpp_joinpath::operator::{IndexScan, PathOperatorTrait, SeqScan};
use mpp_joinpath::optimizer::{OptimizerContext, PlannerConfig};
use mpp_joinpath::plan::{PathBuilder, PathRef};
use mpp_joinpath::pool::dominates;
use mpp_joinpath::properties::{EcId, EcMember, EquivalenceClass, PathKey, PathKeys};
use mpp_joinpath::relation::{RelId, RelIds, RelSummary};

pub const A: RelId = 1;
pub const B: RelId = 2;

pub fn a() -> RelIds {
    RelIds::single(A)
}

pub fn b() -> RelIds {
    RelIds::single(B)
}

/// Context whose eclasses `0..eclasses` each equate a column of `A` with a column of `B`.
pub fn context(config: PlannerConfig, eclasses: usize) -> OptimizerContext {
    let mut ctx = OptimizerContext::new(config);
    for ec in 0..eclasses {
        ctx.add_eclass(EquivalenceClass::new(
            ec,
            [EcMember::var(a()), EcMember::var(b())],
        ));
    }
    ctx
}

/// `a.c{ec} = b.c{ec}`, mergeable, hashable and redistributable.
pub fn equijoin(ec: EcId) -> Rc<RestrictClause> {
    Rc::new(RestrictClause::equijoin(
        format!("a.c{} = b.c{}", ec, ec),
        (a(), ec),
        (b(), ec),
    ))
}

pub fn keys(ecs: &[EcId]) -> PathKeys {
    ecs.iter().copied().map(PathKey::asc).collect()
}

pub fn seq_scan(ctx: &OptimizerContext, rel: &RelSummary, total: f64) -> PathRef {
    seq_scan_with_costs(ctx, rel, PathCosts::new(0.0, total))
}

pub fn seq_scan_with_costs(ctx: &OptimizerContext, rel: &RelSummary, costs: PathCosts) -> PathRef {
    PathBuilder::new(
        ctx.next_path_id(),
        SeqScan::new(format!("t{}", rel.relids())),
        rel.relids(),
    )
    .with_distribution(rel.distribution_policy().cloned().unwrap_or_default())
    .with_size(rel.rows(), rel.width())
    .with_costs(costs)
    .build()
}

pub fn index_scan(ctx: &OptimizerContext, rel: &RelSummary, total: f64, pathkeys: PathKeys) -> PathRef {
    index_scan_with_costs(ctx, rel, PathCosts::new(0.0, total), pathkeys)
}

pub fn index_scan_with_costs(
    ctx: &OptimizerContext,
    rel: &RelSummary,
    costs: PathCosts,
    pathkeys: PathKeys,
) -> PathRef {
    PathBuilder::new(
        ctx.next_path_id(),
        IndexScan::new(format!("t{}", rel.relids()), "idx"),
        rel.relids(),
    )
    .with_pathkeys(pathkeys)
    .with_distribution(rel.distribution_policy().cloned().unwrap_or_default())
    .with_size(rel.rows(), rel.width())
    .with_costs(costs)
    .build()
}

/// Index scan probing with values from `outer`, returning `rows` rows per probe.
pub fn param_index_scan(
    ctx: &OptimizerContext,
    rel: &RelSummary,
    total: f64,
    rows: f64,
    outer: RelIds,
) -> PathRef {
    param_index_scan_with_costs(ctx, rel, PathCosts::new(0.0, total), rows, outer)
}

pub fn param_index_scan_with_costs(
    ctx: &OptimizerContext,
    rel: &RelSummary,
    costs: PathCosts,
    rows: f64,
    outer: RelIds,
) -> PathRef {
    PathBuilder::new(
        ctx.next_path_id(),
        IndexScan::new(format!("t{}", rel.relids()), "idx_param"),
        rel.relids(),
    )
    .with_distribution(rel.distribution_policy().cloned().unwrap_or_default())
    .with_param_relids(outer)
    .with_size(rows, rel.width())
    .with_costs(costs)
    .build()
}

/// Adds `paths` to `rel` and sets its cheapest paths.
pub fn with_paths(mut rel: RelSummary, paths: Vec<PathRef>) -> RelSummary {
    for path in paths {
        rel.add_path(path);
    }
    assert!(rel.set_cheapest());
    rel
}

pub fn join_rel() -> RelSummary {
    RelSummary::join(a().union(b())).with_size(100.0, 16)
}

pub fn operator_names(rel: &RelSummary) -> Vec<&'static str> {
    rel.paths().iter().map(|p| p.operator().name()).collect()
}

pub fn paths_named<'a>(rel: &'a RelSummary, name: &str) -> Vec<&'a PathRef> {
    rel.paths()
        .iter()
        .filter(|p| p.operator().name() == name)
        .collect()
}

/// Whether any node of any surviving path is a `name` operator.
pub fn contains_operator(rel: &RelSummary, name: &str) -> bool {
    rel.paths()
        .iter()
        .any(|p| p.bfs_iter().any(|node| node.operator().name() == name))
}

pub fn assert_antichain(rel: &RelSummary) {
    for (i, x) in rel.paths().iter().enumerate() {
        for (j, y) in rel.paths().iter().enumerate() {
            if i != j {
                assert!(!dominates(x, y), "{} dominates {}", x, y);
            }
        }
    }
}
