mod common;

use std::rc::Rc;

use common::*;
use mpp_joinpath::clause::RestrictClause;
use mpp_joinpath::cost::PathCosts;
use mpp_joinpath::error::JoinPathError;
use mpp_joinpath::joinpath::enumerate_join_paths;
use mpp_joinpath::joinrels::populate_join_rel;
use mpp_joinpath::operator::{
    JoinKind, PathOperatorTrait, Unique, UniqueMethod, WorkTableScan,
};
use mpp_joinpath::optimizer::{OptimizerContext, PlannerConfig};
use mpp_joinpath::plan::{PathBuilder, PathRef};
use mpp_joinpath::pool::CostCriterion;
use mpp_joinpath::properties::Distribution;
use mpp_joinpath::relation::{RelSummary, RteKind};

const TOLERANCE: f64 = 1e-9;

/// A handful of input shapes: sorted and unsorted, co-located and not.
fn input_shapes(ctx: &OptimizerContext) -> Vec<(RelSummary, RelSummary)> {
    let mut shapes = vec![];
    for (outer_policy, inner_policy) in [
        (None, None),
        (Some(Distribution::hashed([0])), Some(Distribution::Strewn)),
        (Some(Distribution::Strewn), Some(Distribution::Replicated)),
    ] {
        let mut outer = RelSummary::base(A).with_size(100.0, 8);
        let mut inner = RelSummary::base(B).with_size(40.0, 8);
        if let Some(policy) = outer_policy {
            outer = outer.with_distribution_policy(policy);
        }
        if let Some(policy) = inner_policy {
            inner = inner.with_distribution_policy(policy);
        }
        let outer_paths = vec![
            seq_scan(ctx, &outer, 100.0),
            index_scan(ctx, &outer, 180.0, keys(&[0, 1])),
        ];
        let inner_paths = vec![
            seq_scan(ctx, &inner, 40.0),
            index_scan(ctx, &inner, 70.0, keys(&[1])),
        ];
        shapes.push((with_paths(outer, outer_paths), with_paths(inner, inner_paths)));
    }
    shapes
}

fn configs() -> Vec<PlannerConfig> {
    vec![
        PlannerConfig::default(),
        PlannerConfig {
            num_segments: 4,
            ..Default::default()
        },
        PlannerConfig {
            enable_hashjoin: false,
            mergejoin_key_rotations: false,
            ..Default::default()
        },
        PlannerConfig {
            hashjoin_size_heuristic: true,
            ..Default::default()
        },
    ]
}

fn clauses() -> Vec<Rc<RestrictClause>> {
    vec![equijoin(0), equijoin(1)]
}

#[test]
fn test_paths_join_the_given_inputs() {
    for config in configs() {
        let ctx = context(config, 2);
        for (outer, inner) in input_shapes(&ctx) {
            for kind in [JoinKind::Inner, JoinKind::Left, JoinKind::LeftAntiSemi] {
                let mut join = join_rel();
                enumerate_join_paths(&ctx, &mut join, &outer, &inner, kind, &clauses()).unwrap();
                assert!(!join.paths().is_empty());

                for path in join.paths() {
                    assert_eq!(join.relids(), path.parent());
                    let (path_outer, path_inner) = path.join_inputs().unwrap();
                    assert_eq!(outer.relids(), path_outer.unwrapped().parent());
                    assert_eq!(inner.relids(), path_inner.unwrapped().parent());
                    assert_eq!(kind, path.operator().join().unwrap().join_kind());
                }
            }
        }
    }
}

#[test]
fn test_survivors_form_an_antichain() {
    for config in configs() {
        let ctx = context(config, 2);
        for (outer, inner) in input_shapes(&ctx) {
            let mut join = join_rel();
            populate_join_rel(&ctx, &mut join, &outer, &inner, JoinKind::Inner, &clauses())
                .unwrap();
            assert_antichain(&join);
        }
    }
}

#[test]
fn test_input_order_does_not_change_the_cheapest_cost() {
    for config in configs() {
        let ctx = context(config, 2);
        for (rel1, rel2) in input_shapes(&ctx) {
            let mut forward = join_rel();
            populate_join_rel(&ctx, &mut forward, &rel1, &rel2, JoinKind::Inner, &clauses())
                .unwrap();
            let mut backward = join_rel();
            populate_join_rel(&ctx, &mut backward, &rel2, &rel1, JoinKind::Inner, &clauses())
                .unwrap();

            for criterion in [CostCriterion::Total, CostCriterion::Startup] {
                let f = forward.pool().cheapest(criterion).unwrap();
                let b = backward.pool().cheapest(criterion).unwrap();
                assert!((f.total_cost().value() - b.total_cost().value()).abs() < TOLERANCE);
                assert!((f.startup_cost().value() - b.startup_cost().value()).abs() < TOLERANCE);
            }
            assert_eq!(forward.paths().len(), backward.paths().len());
        }
    }
}

#[test]
fn test_some_merge_consumes_every_clause() {
    let config = PlannerConfig {
        enable_nestloop: false,
        enable_hashjoin: false,
        ..Default::default()
    };
    for k in 1..=4 {
        let ctx = context(config.clone(), k);
        let (outer, inner) = input_shapes(&ctx).remove(0);
        let clauses: Vec<_> = (0..k).map(equijoin).collect();

        let mut join = join_rel();
        enumerate_join_paths(&ctx, &mut join, &outer, &inner, JoinKind::Inner, &clauses).unwrap();

        let longest = join
            .paths()
            .iter()
            .filter_map(|p| p.operator().as_merge_join())
            .map(|merge| merge.merge_clauses().len())
            .max();
        assert_eq!(Some(k), longest, "{} merge clauses", k);
    }
}

#[test]
fn test_right_and_full_joins_need_mergeable_clauses() {
    let ctx = context(PlannerConfig::default(), 2);
    let not_mergeable = Rc::new(RestrictClause::new("a.c1 < b.c1", a(), b()));
    let restrict = vec![equijoin(0), not_mergeable];

    for (outer, inner) in input_shapes(&ctx) {
        let mut join = join_rel();
        enumerate_join_paths(&ctx, &mut join, &outer, &inner, JoinKind::Right, &restrict).unwrap();
        assert!(!contains_operator(&join, "MergeJoin"));

        let mut join = join_rel();
        let err = enumerate_join_paths(&ctx, &mut join, &outer, &inner, JoinKind::Full, &restrict)
            .unwrap_err();
        assert_eq!(
            Some(&JoinPathError::FullJoinNotMergeable),
            err.downcast_ref::<JoinPathError>()
        );
    }
}

#[test]
fn test_right_join_on_merge_clauses_merges() {
    let ctx = context(PlannerConfig::default(), 2);
    for (outer, inner) in input_shapes(&ctx) {
        let mut join = join_rel();
        enumerate_join_paths(&ctx, &mut join, &outer, &inner, JoinKind::Right, &clauses()).unwrap();
        assert!(!join.paths().is_empty());
        assert!(join
            .paths()
            .iter()
            .all(|p| p.operator().as_merge_join().is_some()));
    }
}

/// Enumerates an inner join of a 100 row seq scan with `inner_path` as the only inner path,
/// nested loops only.
fn nestloop_over(ctx: &OptimizerContext, inner: RelSummary, inner_path: PathRef) -> RelSummary {
    let outer = RelSummary::base(A).with_size(100.0, 8);
    let outer_paths = vec![seq_scan(ctx, &outer, 100.0)];
    let outer = with_paths(outer, outer_paths);
    let inner = with_paths(inner, vec![inner_path]);

    let mut join = join_rel();
    enumerate_join_paths(ctx, &mut join, &outer, &inner, JoinKind::Inner, &clauses()).unwrap();
    join
}

fn nestloop_only() -> PlannerConfig {
    PlannerConfig {
        enable_mergejoin: false,
        enable_hashjoin: false,
        ..Default::default()
    }
}

#[test]
fn test_plain_scan_inner_is_materialized() {
    let ctx = context(nestloop_only(), 2);
    let inner = RelSummary::base(B).with_size(40.0, 8);
    let scan = seq_scan(&ctx, &inner, 40.0);
    let join = nestloop_over(&ctx, inner, scan);

    assert!(contains_operator(&join, "Material"));
}

#[test]
fn test_work_table_inner_is_not_materialized() {
    let ctx = context(nestloop_only(), 2);
    let inner = RelSummary::base(B)
        .with_size(40.0, 8)
        .with_rte_kind(RteKind::WorkTable);
    let scan = PathBuilder::new(ctx.next_path_id(), WorkTableScan::new("cte"), inner.relids())
        .with_size(40.0, 8)
        .with_costs(PathCosts::new(0.0, 40.0))
        .build();
    let join = nestloop_over(&ctx, inner, scan);

    assert!(!join.paths().is_empty());
    assert!(!contains_operator(&join, "Material"));
}

#[test]
fn test_unique_inner_is_materialized_only_without_buffer() {
    for (method, materialized) in [
        (UniqueMethod::Hash, false),
        (UniqueMethod::Sort, false),
        (UniqueMethod::NoOp, true),
    ] {
        let ctx = context(nestloop_only(), 2);
        let inner = RelSummary::base(B).with_size(40.0, 8);
        let scan = seq_scan(&ctx, &inner, 40.0);
        let unique = PathBuilder::new(ctx.next_path_id(), Unique::new(method), inner.relids())
            .add_inputs([scan])
            .with_size(40.0, 8)
            .with_costs(PathCosts::new(0.0, 60.0))
            .build();
        let join = nestloop_over(&ctx, inner, unique);

        assert_eq!(
            materialized,
            contains_operator(&join, "Material"),
            "unique method {:?}",
            method
        );
    }
}
