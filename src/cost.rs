//! Cost representation and the cost model consulted by the path factory.
//!
//! The enumerator treats cost formulas as opaque: it only ever compares the costs stamped on
//! paths. [`SimpleCostModel`] is a deliberately small model, good enough to drive planning in
//! tests and in embedders that don't bring their own.

use std::cmp::Ordering;
use std::fmt::Debug;

use derive_more::{Add, AddAssign, Display, From, Into, Mul, Sub};
use serde::{Deserialize, Serialize};

use crate::operator::PathOperatorTrait;
use crate::plan::{Path, PathRef};
use crate::properties::MotionKind;

/// Abstract cost unit.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    PartialOrd,
    Add,
    AddAssign,
    Sub,
    Mul,
    From,
    Into,
    Display,
    Serialize,
    Deserialize,
)]
pub struct Cost(f64);

impl Cost {
    /// Penalty a cost model may add to discourage, without forbidding, a plan shape.
    pub const DISABLED: Cost = Cost(1.0e10);

    pub fn zero() -> Self {
        Cost(0.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Total order over costs, `NaN` sorting last.
    pub fn total_cmp(&self, other: &Cost) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Startup and total cost of a path.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PathCosts {
    pub startup: Cost,
    pub total: Cost,
}

impl PathCosts {
    pub fn new<S: Into<Cost>, T: Into<Cost>>(startup: S, total: T) -> Self {
        Self {
            startup: startup.into(),
            total: total.into(),
        }
    }
}

/// Estimates the cost of the operators the path factory creates.
///
/// Every method receives fully built input paths; row estimates of the new node are passed in
/// where the model can't derive them from the inputs.
pub trait CostModel: Debug {
    fn cost_sort(&self, input: &Path) -> PathCosts;

    fn cost_material(&self, input: &Path) -> PathCosts;

    /// Cost of scanning `path` again after the first full scan.
    fn cost_rescan(&self, path: &Path) -> PathCosts;

    fn cost_motion(&self, motion: &MotionKind, input: &Path, num_segments: usize) -> PathCosts;

    fn cost_append(&self, members: &[PathRef]) -> PathCosts;

    fn cost_nestloop(&self, outer: &Path, inner: &Path, rows: f64) -> PathCosts;

    /// Both inputs are already in merge order (sorts are separate paths).
    fn cost_mergejoin(&self, outer: &Path, inner: &Path, rows: f64) -> PathCosts;

    fn cost_hashjoin(&self, outer: &Path, inner: &Path, rows: f64) -> PathCosts;
}

/// Per-row charges of [`SimpleCostModel`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostParams {
    /// Charged by every operator for each input row it processes.
    pub cpu_per_row: f64,
    pub sort_per_row: f64,
    pub hash_build_per_row: f64,
    pub hash_probe_per_row: f64,
    /// Reading back a buffered (materialized) row.
    pub rescan_per_row: f64,
    /// Sending one row through a motion.
    pub motion_per_row: f64,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            cpu_per_row: 1.0,
            sort_per_row: 2.0,
            hash_build_per_row: 3.0,
            hash_probe_per_row: 1.0,
            rescan_per_row: 0.5,
            motion_per_row: 1.0,
        }
    }
}

/// Linear per-row cost model.
#[derive(Clone, Debug, Default)]
pub struct SimpleCostModel {
    params: CostParams,
}

impl SimpleCostModel {
    pub fn new(params: CostParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CostParams {
        &self.params
    }
}

impl CostModel for SimpleCostModel {
    fn cost_sort(&self, input: &Path) -> PathCosts {
        let startup = input.total_cost() + Cost::from(self.params.sort_per_row * input.rows());
        PathCosts {
            startup,
            total: startup,
        }
    }

    fn cost_material(&self, input: &Path) -> PathCosts {
        PathCosts {
            startup: input.startup_cost(),
            total: input.total_cost() + Cost::from(self.params.cpu_per_row * input.rows()),
        }
    }

    fn cost_rescan(&self, path: &Path) -> PathCosts {
        if path.operator().buffers_output() {
            PathCosts::new(0.0, self.params.rescan_per_row * path.rows())
        } else {
            PathCosts {
                startup: path.startup_cost(),
                total: path.total_cost(),
            }
        }
    }

    fn cost_motion(&self, motion: &MotionKind, input: &Path, num_segments: usize) -> PathCosts {
        let moved = match motion {
            MotionKind::Broadcast => input.rows() * num_segments.max(1) as f64,
            _ => input.rows(),
        };
        PathCosts {
            startup: input.startup_cost(),
            total: input.total_cost() + Cost::from(self.params.motion_per_row * moved),
        }
    }

    fn cost_append(&self, members: &[PathRef]) -> PathCosts {
        let startup = members
            .first()
            .map(|p| p.startup_cost())
            .unwrap_or_default();
        let total = members
            .iter()
            .fold(Cost::zero(), |acc, p| acc + p.total_cost());
        PathCosts { startup, total }
    }

    fn cost_nestloop(&self, outer: &Path, inner: &Path, _rows: f64) -> PathCosts {
        let rescan = self.cost_rescan(inner);
        let rescans = (outer.rows() - 1.0).max(0.0);
        PathCosts {
            startup: outer.startup_cost() + inner.startup_cost(),
            total: outer.total_cost()
                + inner.total_cost()
                + Cost::from(rescans * rescan.total.value())
                + Cost::from(self.params.cpu_per_row * outer.rows() * inner.rows()),
        }
    }

    fn cost_mergejoin(&self, outer: &Path, inner: &Path, _rows: f64) -> PathCosts {
        PathCosts {
            startup: outer.startup_cost() + inner.startup_cost(),
            total: outer.total_cost()
                + inner.total_cost()
                + Cost::from(self.params.cpu_per_row * (outer.rows() + inner.rows())),
        }
    }

    fn cost_hashjoin(&self, outer: &Path, inner: &Path, _rows: f64) -> PathCosts {
        let build = inner.total_cost() + Cost::from(self.params.hash_build_per_row * inner.rows());
        PathCosts {
            startup: build + outer.startup_cost(),
            total: build
                + outer.total_cost()
                + Cost::from(self.params.hash_probe_per_row * outer.rows()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_arithmetic() {
        let a = Cost::from(1.5);
        let b = Cost::from(2.0);
        assert_eq!(Cost::from(3.5), a + b);
        assert_eq!(Cost::from(0.5), b - a);
        assert_eq!(Cost::from(3.0), a * 2.0);
        assert!(a < b);
        assert_eq!(Ordering::Less, a.total_cmp(&b));
    }

    #[test]
    fn test_cost_params_from_json() {
        let params: CostParams = serde_json::from_str(r#"{"sort_per_row": 4.0}"#).unwrap();
        assert_eq!(4.0, params.sort_per_row);
        assert_eq!(CostParams::default().cpu_per_row, params.cpu_per_row);
    }
}
