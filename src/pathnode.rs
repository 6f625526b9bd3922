//! The path factory: builds join paths and the wrappers they need.
//!
//! Besides stamping costs from the [`CostModel`](crate::cost::CostModel), the factory makes the
//! two inputs of a join co-located on the cluster, inserting gather, broadcast or redistribute
//! motions below the join. The enumerator never sees those decisions directly, only the costs
//! and row counts of the paths it gets back. A combination no motion can repair comes back as
//! `None`.

use std::rc::Rc;

use log::trace;

use crate::clause::{ClauseSide, OrientedClause, RestrictClause};
use crate::cost::PathCosts;
use crate::operator::{
    Append, HashJoin, Join, JoinKind, Material, MergeJoin, Motion, NestLoop, PathOperatorTrait,
    Sort,
};
use crate::optimizer::OptimizerContext;
use crate::plan::{Path, PathBuilder, PathRef};
use crate::properties::{Distribution, DistributionKeys, MotionKind, PathKeys, PhysicalProp};
use crate::relation::{RelIds, RelSummary};

/// Motions to put below a join and the distribution of the join result.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinMotions {
    pub outer: Option<MotionKind>,
    pub inner: Option<MotionKind>,
    pub distribution: Distribution,
}

impl JoinMotions {
    fn none(distribution: Distribution) -> Self {
        Self {
            outer: None,
            inner: None,
            distribution,
        }
    }

    fn gather_both() -> Self {
        let target = Distribution::SingleSegment;
        Self {
            outer: Some(MotionKind::Gather {
                target: target.clone(),
            }),
            inner: Some(MotionKind::Gather {
                target: target.clone(),
            }),
            distribution: target,
        }
    }
}

/// Whether the inner side may be sent whole to every segment: every outer row must still meet
/// every inner row exactly once and unmatched inner rows must not be emitted.
fn can_broadcast_inner(join_kind: JoinKind) -> bool {
    matches!(
        join_kind,
        JoinKind::Inner | JoinKind::Left | JoinKind::LeftAntiSemi | JoinKind::LeftAntiSemiNotIn
    )
}

fn can_broadcast_outer(join_kind: JoinKind) -> bool {
    matches!(join_kind, JoinKind::Inner | JoinKind::Right)
}

/// Whether unmatched inner rows are emitted.
fn preserves_inner(join_kind: JoinKind) -> bool {
    matches!(join_kind, JoinKind::Right | JoinKind::Full)
}

/// Maps hash keys of one side to the paired keys on the other side through the clauses.
fn map_keys(
    keys: &DistributionKeys,
    clauses: &[OrientedClause],
    from: ClauseSide,
    to: ClauseSide,
) -> Option<DistributionKeys> {
    keys.iter()
        .map(|key| {
            clauses
                .iter()
                .find(|c| c.ec_on(from) == Some(*key))
                .and_then(|c| c.ec_on(to))
        })
        .collect()
}

/// Decides how to co-locate the inputs of a join.
pub fn plan_join_motions(
    join_kind: JoinKind,
    outer: &Distribution,
    inner: &Distribution,
    redistribution_clauses: &[OrientedClause],
) -> JoinMotions {
    use Distribution::*;

    match (outer, inner) {
        (General, General) => JoinMotions::none(General),
        // Preserved inner rows must be produced exactly once.
        (o, General) if o.is_partitioned() && preserves_inner(join_kind) => JoinMotions {
            outer: Some(MotionKind::Gather {
                target: SingleSegment,
            }),
            inner: None,
            distribution: SingleSegment,
        },
        (_, General) => JoinMotions::none(outer.clone()),
        (General, _) if join_kind == JoinKind::Inner => JoinMotions::none(inner.clone()),
        (General, _) if inner.is_single() => JoinMotions::none(inner.clone()),
        // Preserved outer rows must be produced exactly once.
        (General, _) => JoinMotions {
            outer: None,
            inner: Some(MotionKind::Gather {
                target: SingleSegment,
            }),
            distribution: SingleSegment,
        },
        (o, i) if o.is_single() && i.is_single() => {
            if o == i {
                JoinMotions::none(o.clone())
            } else {
                JoinMotions {
                    outer: None,
                    inner: Some(MotionKind::Gather { target: o.clone() }),
                    distribution: o.clone(),
                }
            }
        }
        (o, _) if o.is_single() => JoinMotions {
            outer: None,
            inner: Some(MotionKind::Gather { target: o.clone() }),
            distribution: o.clone(),
        },
        (_, i) if i.is_single() => JoinMotions {
            outer: Some(MotionKind::Gather { target: i.clone() }),
            inner: None,
            distribution: i.clone(),
        },
        (_, Replicated) if can_broadcast_inner(join_kind) => JoinMotions::none(outer.clone()),
        (Replicated, _) if can_broadcast_outer(join_kind) => JoinMotions::none(inner.clone()),
        (Replicated, _) | (_, Replicated) => JoinMotions::gather_both(),
        (o, i) => plan_partitioned_join(join_kind, o, i, redistribution_clauses),
    }
}

fn plan_partitioned_join(
    join_kind: JoinKind,
    outer: &Distribution,
    inner: &Distribution,
    clauses: &[OrientedClause],
) -> JoinMotions {
    if let Distribution::Hashed(outer_keys) = outer {
        if let Some(inner_keys) = map_keys(outer_keys, clauses, ClauseSide::Outer, ClauseSide::Inner)
        {
            if inner == &Distribution::Hashed(inner_keys.clone()) {
                return JoinMotions::none(outer.clone());
            }
            return JoinMotions {
                outer: None,
                inner: Some(MotionKind::Redistribute(inner_keys)),
                distribution: outer.clone(),
            };
        }
    }

    if let Distribution::Hashed(inner_keys) = inner {
        if let Some(outer_keys) = map_keys(inner_keys, clauses, ClauseSide::Inner, ClauseSide::Outer)
        {
            return JoinMotions {
                outer: Some(MotionKind::Redistribute(outer_keys)),
                inner: None,
                distribution: inner.clone(),
            };
        }
    }

    let (outer_keys, inner_keys): (DistributionKeys, DistributionKeys) = clauses
        .iter()
        .filter_map(|c| Some((c.outer_ec()?, c.inner_ec()?)))
        .unzip();
    if !outer_keys.is_empty() {
        return JoinMotions {
            outer: Some(MotionKind::Redistribute(outer_keys.clone())),
            inner: Some(MotionKind::Redistribute(inner_keys)),
            distribution: Distribution::Hashed(outer_keys),
        };
    }

    if can_broadcast_inner(join_kind) {
        JoinMotions {
            outer: None,
            inner: Some(MotionKind::Broadcast),
            distribution: outer.clone(),
        }
    } else if can_broadcast_outer(join_kind) {
        JoinMotions {
            outer: Some(MotionKind::Broadcast),
            inner: None,
            distribution: inner.clone(),
        }
    } else {
        JoinMotions::gather_both()
    }
}

/// Leading keys of `pathkeys` that some merge clause uses on `side`.
fn merge_prefix(pathkeys: &PathKeys, merge_clauses: &[OrientedClause], side: ClauseSide) -> PathKeys {
    pathkeys
        .iter()
        .take_while(|key| merge_clauses.iter().any(|c| c.ec_on(side) == Some(key.ec())))
        .copied()
        .collect()
}

/// Builds paths for one join relation.
pub struct PathFactory<'a> {
    ctx: &'a OptimizerContext,
    relids: RelIds,
    rows: f64,
    width: u32,
}

impl<'a> PathFactory<'a> {
    pub fn new(ctx: &'a OptimizerContext, join_rel: &RelSummary) -> Self {
        Self {
            ctx,
            relids: join_rel.relids(),
            rows: join_rel.rows(),
            width: join_rel.width(),
        }
    }

    fn join_param_relids(outer: &Path, inner: &Path) -> RelIds {
        outer
            .param_relids()
            .union(inner.param_relids().difference(outer.parent()))
    }

    fn co_locate(
        &self,
        join_kind: JoinKind,
        outer: &PathRef,
        inner: &PathRef,
        redistribution_clauses: &[OrientedClause],
    ) -> Option<(PathRef, PathRef, Distribution)> {
        let motions = plan_join_motions(
            join_kind,
            outer.distribution(),
            inner.distribution(),
            redistribution_clauses,
        );
        let outer = self.apply_motion(outer, motions.outer)?;
        let inner = self.apply_motion(inner, motions.inner)?;
        Some((outer, inner, motions.distribution))
    }

    /// Puts `motion` above `input`. A parameterized path can't be moved, its parameters come from
    /// the rows of the current process.
    fn apply_motion(&self, input: &PathRef, motion: Option<MotionKind>) -> Option<PathRef> {
        let motion = match motion {
            None => return Some(input.clone()),
            Some(motion) => motion,
        };
        if input.is_parameterized() {
            trace!("Can't put {} above parameterized {}", motion, input);
            return None;
        }

        let pathkeys = if motion.preserves_order() {
            input.pathkeys().clone()
        } else {
            PathKeys::empty()
        };
        let costs = self
            .ctx
            .cost_model()
            .cost_motion(&motion, input, self.ctx.num_segments());
        Some(
            PathBuilder::new(self.ctx.next_path_id(), Motion::new(motion.clone()), input.parent())
                .add_inputs([input.clone()])
                .with_pathkeys(pathkeys)
                .with_distribution(motion.output_distribution())
                .with_size(input.rows(), input.width())
                .with_costs(costs)
                .build(),
        )
    }

    /// Sorts `input` by `keys` unless it is sorted well enough already.
    pub fn make_sort(&self, input: &PathRef, keys: &PathKeys) -> PathRef {
        if input.pathkeys().satisfies(keys) {
            return input.clone();
        }
        let costs = self.ctx.cost_model().cost_sort(input);
        PathBuilder::new(self.ctx.next_path_id(), Sort::new(keys.clone()), input.parent())
            .add_inputs([input.clone()])
            .with_pathkeys(keys.clone())
            .with_distribution(input.distribution().clone())
            .with_param_relids(input.param_relids())
            .with_size(input.rows(), input.width())
            .with_costs(costs)
            .build()
    }

    pub fn make_material(&self, input: &PathRef) -> PathRef {
        let costs = self.ctx.cost_model().cost_material(input);
        PathBuilder::new(self.ctx.next_path_id(), Material, input.parent())
            .add_inputs([input.clone()])
            .with_pathkeys(input.pathkeys().clone())
            .with_distribution(input.distribution().clone())
            .with_param_relids(input.param_relids())
            .with_size(input.rows(), input.width())
            .with_costs(costs)
            .build()
    }

    pub fn make_append(&self, rel: &RelSummary, members: Vec<PathRef>) -> PathRef {
        let distribution = match members.first() {
            Some(first) if members.iter().all(|m| m.distribution() == first.distribution()) => {
                first.distribution().clone()
            }
            Some(_) => Distribution::Strewn,
            None => Distribution::default(),
        };
        let param_relids = members
            .iter()
            .fold(RelIds::empty(), |acc, m| acc.union(m.param_relids()));
        let rows = members.iter().map(|m| m.rows()).sum();
        let costs = self.ctx.cost_model().cost_append(&members);
        PathBuilder::new(self.ctx.next_path_id(), Append, rel.relids())
            .add_inputs(members)
            .with_distribution(distribution)
            .with_param_relids(param_relids)
            .with_size(rows, rel.width())
            .with_costs(costs)
            .build()
    }

    pub fn make_nested_loop(
        &self,
        join_kind: JoinKind,
        outer: &PathRef,
        inner: &PathRef,
        restrict_list: &[Rc<RestrictClause>],
        redistribution_clauses: &[OrientedClause],
        pathkeys: &PathKeys,
    ) -> Option<PathRef> {
        let (outer_moved, inner_moved, distribution) =
            self.co_locate(join_kind, outer, inner, redistribution_clauses)?;

        // A motion can't be rescanned, so a moved inner is buffered.
        let inner_moved = if !Rc::ptr_eq(&inner_moved, inner)
            && !inner_moved.operator().cheaply_rescannable()
        {
            self.make_material(&inner_moved)
        } else {
            inner_moved
        };
        // A nested loop emits rows in outer order, which an order destroying motion loses.
        let pathkeys = if outer_moved.pathkeys().satisfies(outer.pathkeys()) {
            pathkeys.clone()
        } else {
            PathKeys::empty()
        };

        let costs = self
            .ctx
            .cost_model()
            .cost_nestloop(&outer_moved, &inner_moved, self.rows);
        Some(self.build_join(
            NestLoop::new(Join::new(join_kind, restrict_list)),
            outer_moved,
            inner_moved,
            pathkeys,
            distribution,
            costs,
        ))
    }

    /// Builds a merge join. Empty `outer_sort_keys`/`inner_sort_keys` mean the input is expected
    /// to come presorted; a sort is only added when the input doesn't satisfy the keys.
    #[allow(clippy::too_many_arguments)]
    pub fn make_merge(
        &self,
        join_kind: JoinKind,
        outer: &PathRef,
        inner: &PathRef,
        restrict_list: &[Rc<RestrictClause>],
        merge_clauses: &[OrientedClause],
        redistribution_clauses: &[OrientedClause],
        pathkeys: &PathKeys,
        outer_sort_keys: &PathKeys,
        inner_sort_keys: &PathKeys,
    ) -> Option<PathRef> {
        let (outer_moved, inner_moved, distribution) =
            self.co_locate(join_kind, outer, inner, redistribution_clauses)?;

        let outer_keys = if outer_sort_keys.is_empty() {
            merge_prefix(outer.pathkeys(), merge_clauses, ClauseSide::Outer)
        } else {
            outer_sort_keys.clone()
        };
        let inner_keys = if inner_sort_keys.is_empty() {
            merge_prefix(inner.pathkeys(), merge_clauses, ClauseSide::Inner)
        } else {
            inner_sort_keys.clone()
        };
        let outer_sorted = self.make_sort(&outer_moved, &outer_keys);
        let inner_sorted = self.make_sort(&inner_moved, &inner_keys);

        let applied_outer_keys = if Rc::ptr_eq(&outer_sorted, &outer_moved) {
            PathKeys::empty()
        } else {
            outer_keys
        };
        let applied_inner_keys = if Rc::ptr_eq(&inner_sorted, &inner_moved) {
            PathKeys::empty()
        } else {
            inner_keys
        };

        // Merged rows keep only the order the outer input actually has after any motion.
        let pathkeys = pathkeys.common_prefix(outer_sorted.pathkeys());

        let costs = self
            .ctx
            .cost_model()
            .cost_mergejoin(&outer_sorted, &inner_sorted, self.rows);
        Some(self.build_join(
            MergeJoin::new(
                Join::new(join_kind, restrict_list),
                merge_clauses.to_vec(),
                applied_outer_keys,
                applied_inner_keys,
            ),
            outer_sorted,
            inner_sorted,
            pathkeys,
            distribution,
            costs,
        ))
    }

    /// Builds a hash join. The returned path's inputs are the co-located outer and inner, so
    /// callers can read their row counts after any motion.
    pub fn make_hash(
        &self,
        join_kind: JoinKind,
        outer: &PathRef,
        inner: &PathRef,
        restrict_list: &[Rc<RestrictClause>],
        redistribution_clauses: &[OrientedClause],
        hash_clauses: &[OrientedClause],
    ) -> Option<PathRef> {
        let (outer_moved, inner_moved, distribution) =
            self.co_locate(join_kind, outer, inner, redistribution_clauses)?;
        let costs = self
            .ctx
            .cost_model()
            .cost_hashjoin(&outer_moved, &inner_moved, self.rows);
        Some(self.build_join(
            HashJoin::new(Join::new(join_kind, restrict_list), hash_clauses.to_vec()),
            outer_moved,
            inner_moved,
            PathKeys::empty(),
            distribution,
            costs,
        ))
    }

    fn build_join<O: Into<crate::operator::PathOperator>>(
        &self,
        operator: O,
        outer: PathRef,
        inner: PathRef,
        pathkeys: PathKeys,
        distribution: Distribution,
        costs: PathCosts,
    ) -> PathRef {
        let param_relids = Self::join_param_relids(&outer, &inner);
        PathBuilder::new(self.ctx.next_path_id(), operator, self.relids)
            .add_inputs([outer, inner])
            .with_pathkeys(pathkeys)
            .with_distribution(distribution)
            .with_param_relids(param_relids)
            .with_size(self.rows, self.width)
            .with_costs(costs)
            .build()
    }
}
