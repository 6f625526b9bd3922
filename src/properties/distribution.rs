use std::fmt::{Display, Formatter};

use itertools::Itertools;
use smallvec::SmallVec;

use crate::properties::{EcId, PhysicalProp};

pub type DistributionKeys = SmallVec<[EcId; 4]>;

/// Where the rows of a path live across the cluster.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Distribution {
    /// On the coordinator only.
    Entry,
    /// On a single segment.
    SingleSegment,
    /// Every segment holds all rows.
    Replicated,
    /// Hash partitioned by the listed equivalence classes.
    Hashed(DistributionKeys),
    /// Partitioned with no usable partitioning key.
    Strewn,
    /// Computable anywhere, e.g. constant functions and `VALUES`.
    General,
}

impl Distribution {
    pub fn hashed<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = EcId>,
    {
        Distribution::Hashed(keys.into_iter().collect())
    }

    /// Rows live in exactly one process.
    pub fn is_single(&self) -> bool {
        matches!(self, Distribution::Entry | Distribution::SingleSegment)
    }

    /// Rows are split across segments, each row stored once.
    pub fn is_partitioned(&self) -> bool {
        matches!(self, Distribution::Hashed(_) | Distribution::Strewn)
    }

    /// Rows one segment sees out of `rows` in total.
    pub fn rows_per_segment(&self, rows: f64, num_segments: usize) -> f64 {
        if self.is_partitioned() {
            rows / num_segments.max(1) as f64
        } else {
            rows
        }
    }
}

impl Default for Distribution {
    fn default() -> Self {
        Distribution::Entry
    }
}

impl PhysicalProp for Distribution {
    /// Distributions are only interchangeable when they are identical.
    fn satisfies(&self, required: &Self) -> bool {
        self == required
    }
}

impl Display for Distribution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Distribution::Entry => write!(f, "entry"),
            Distribution::SingleSegment => write!(f, "single"),
            Distribution::Replicated => write!(f, "replicated"),
            Distribution::Hashed(keys) => {
                write!(f, "hashed({})", keys.iter().map(|k| format!("ec{}", k)).join(", "))
            }
            Distribution::Strewn => write!(f, "strewn"),
            Distribution::General => write!(f, "general"),
        }
    }
}

/// Data movement inserted below a join to co-locate its inputs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MotionKind {
    /// Collect all rows into one process; keeps the input order.
    Gather { target: Distribution },
    /// Send every row to every segment.
    Broadcast,
    /// Repartition rows by hashing the given equivalence classes.
    Redistribute(DistributionKeys),
}

impl MotionKind {
    pub fn output_distribution(&self) -> Distribution {
        match self {
            MotionKind::Gather { target } => target.clone(),
            MotionKind::Broadcast => Distribution::Replicated,
            MotionKind::Redistribute(keys) => Distribution::Hashed(keys.clone()),
        }
    }

    pub fn preserves_order(&self) -> bool {
        matches!(self, MotionKind::Gather { .. })
    }
}

impl Display for MotionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MotionKind::Gather { target } => write!(f, "Gather to {}", target),
            MotionKind::Broadcast => write!(f, "Broadcast"),
            MotionKind::Redistribute(keys) => write!(
                f,
                "Redistribute by {}",
                keys.iter().map(|k| format!("ec{}", k)).join(", ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_per_segment() {
        assert_eq!(25.0, Distribution::hashed([0]).rows_per_segment(100.0, 4));
        assert_eq!(100.0, Distribution::Replicated.rows_per_segment(100.0, 4));
        assert_eq!(100.0, Distribution::Entry.rows_per_segment(100.0, 4));
    }

    #[test]
    fn test_motion_output() {
        assert_eq!(
            Distribution::hashed([3]),
            MotionKind::Redistribute(smallvec::smallvec![3]).output_distribution()
        );
        assert!(!MotionKind::Broadcast.preserves_order());
        assert!(MotionKind::Gather {
            target: Distribution::Entry
        }
        .preserves_order());
    }
}
