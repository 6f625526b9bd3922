//! Planner context handed to the join enumerator.

use std::cell::Cell;

use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::cost::{CostModel, CostParams, SimpleCostModel};
use crate::operator::JoinKind;
use crate::plan::PathId;
use crate::properties::{EcId, EquivalenceClass, PathKeys};

/// Physical join algorithms.
#[derive(Debug, Hash, EnumSetType, Display, EnumIter)]
pub enum JoinMethod {
    NestLoop,
    MergeJoin,
    HashJoin,
}

/// Planner settings consulted during join enumeration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub enable_nestloop: bool,
    pub enable_mergejoin: bool,
    pub enable_hashjoin: bool,
    /// Set when an earlier planning attempt produced no plan; re-enables every join method.
    pub fallback_mode: bool,
    /// Refuse inner hash joins whose build side needs more memory than the probe side.
    pub hashjoin_size_heuristic: bool,
    /// Outer memory must be at least this multiple of inner memory to pass the size heuristic.
    pub hashjoin_size_ratio: f64,
    /// Also try each merge key rotated to the front when sorting both inputs.
    pub mergejoin_key_rotations: bool,
    /// Number of segments in the cluster.
    pub num_segments: usize,
    pub cost: CostParams,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            enable_nestloop: true,
            enable_mergejoin: true,
            enable_hashjoin: true,
            fallback_mode: false,
            hashjoin_size_heuristic: false,
            hashjoin_size_ratio: 1.0,
            mergejoin_key_rotations: true,
            num_segments: 1,
            cost: CostParams::default(),
        }
    }
}

impl PlannerConfig {
    /// Join methods the enumerator will try for `join_kind`.
    ///
    /// Fallback mode overrides every disable flag at once, and full joins always allow merge
    /// join because nothing else can execute them.
    pub fn effective_join_methods(&self, join_kind: JoinKind) -> EnumSet<JoinMethod> {
        let mut enabled = if self.fallback_mode {
            EnumSet::all()
        } else {
            let mut enabled = EnumSet::empty();
            if self.enable_nestloop {
                enabled |= JoinMethod::NestLoop;
            }
            if self.enable_mergejoin {
                enabled |= JoinMethod::MergeJoin;
            }
            if self.enable_hashjoin {
                enabled |= JoinMethod::HashJoin;
            }
            enabled
        };

        if join_kind == JoinKind::Full {
            enabled |= JoinMethod::MergeJoin;
        }

        enabled & join_kind.supported_methods()
    }

    /// Whether the hash join size heuristic applies to a join of `join_kind`.
    pub fn applies_hashjoin_size_heuristic(&self, join_kind: JoinKind) -> bool {
        self.hashjoin_size_heuristic && !self.fallback_mode && join_kind == JoinKind::Inner
    }
}

/// Planner state shared by every join enumeration of one query.
#[derive(Debug)]
pub struct OptimizerContext {
    config: PlannerConfig,
    eclasses: Vec<EquivalenceClass>,
    /// Ordering the query result should come out in.
    query_pathkeys: PathKeys,
    cost_model: Box<dyn CostModel>,
    next_path_id: Cell<PathId>,
}

impl OptimizerContext {
    pub fn new(config: PlannerConfig) -> Self {
        let cost_model = Box::new(SimpleCostModel::new(config.cost.clone()));
        Self {
            config,
            eclasses: vec![],
            query_pathkeys: PathKeys::empty(),
            cost_model,
            next_path_id: Cell::new(0),
        }
    }

    pub fn with_cost_model(mut self, cost_model: Box<dyn CostModel>) -> Self {
        self.cost_model = cost_model;
        self
    }

    pub fn with_query_pathkeys(mut self, query_pathkeys: PathKeys) -> Self {
        self.query_pathkeys = query_pathkeys;
        self
    }

    /// Registers an equivalence class; ids must be handed out densely from zero.
    pub fn add_eclass(&mut self, eclass: EquivalenceClass) -> EcId {
        debug_assert_eq!(self.eclasses.len(), eclass.id());
        let id = self.eclasses.len();
        self.eclasses.push(eclass);
        id
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn eclass(&self, id: EcId) -> Option<&EquivalenceClass> {
        self.eclasses.get(id)
    }

    pub fn query_pathkeys(&self) -> &PathKeys {
        &self.query_pathkeys
    }

    pub fn cost_model(&self) -> &dyn CostModel {
        self.cost_model.as_ref()
    }

    pub fn num_segments(&self) -> usize {
        self.config.num_segments.max(1)
    }

    /// Hands out a fresh path id.
    pub fn next_path_id(&self) -> PathId {
        let id = self.next_path_id.get();
        self.next_path_id.set(id + 1);
        id
    }
}

impl Default for OptimizerContext {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_overrides_every_flag() {
        let config = PlannerConfig {
            enable_nestloop: false,
            enable_mergejoin: false,
            enable_hashjoin: false,
            fallback_mode: true,
            ..Default::default()
        };
        assert_eq!(EnumSet::all(), config.effective_join_methods(JoinKind::Inner));
    }

    #[test]
    fn test_full_join_forces_merge() {
        let config = PlannerConfig {
            enable_mergejoin: false,
            ..Default::default()
        };
        assert_eq!(
            EnumSet::only(JoinMethod::MergeJoin),
            config.effective_join_methods(JoinKind::Full)
        );
        assert!(config.effective_join_methods(JoinKind::Inner).is_disjoint(EnumSet::only(
            JoinMethod::MergeJoin
        )));
    }

    #[test]
    fn test_not_in_never_merges() {
        let config = PlannerConfig {
            fallback_mode: true,
            ..Default::default()
        };
        assert_eq!(
            JoinMethod::NestLoop | JoinMethod::HashJoin,
            config.effective_join_methods(JoinKind::LeftAntiSemiNotIn)
        );
    }

    #[test]
    fn test_config_from_json() {
        let config: PlannerConfig = serde_json::from_str(
            r#"{"enable_hashjoin": false, "hashjoin_size_heuristic": true, "num_segments": 4}"#,
        )
        .unwrap();
        assert!(!config.enable_hashjoin);
        assert!(config.enable_mergejoin);
        assert_eq!(4, config.num_segments);
        assert!(config.applies_hashjoin_size_heuristic(JoinKind::Inner));
        assert!(!config.applies_hashjoin_size_heuristic(JoinKind::Left));
    }

    #[test]
    fn test_path_ids_are_unique() {
        let ctx = OptimizerContext::default();
        assert_eq!(0, ctx.next_path_id());
        assert_eq!(1, ctx.next_path_id());
    }
}
