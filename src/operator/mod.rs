//! Physical operators a path can be built from.

use enum_as_inner::EnumAsInner;
use enum_dispatch::enum_dispatch;

mod join;
pub use join::*;
mod scan;
pub use scan::*;
mod wrapper;
pub use wrapper::*;

#[enum_dispatch]
pub trait PathOperatorTrait {
    /// Operator name shown in explain output.
    fn name(&self) -> &'static str;

    fn detail(&self) -> String {
        String::new()
    }

    /// Keeps its whole output so that a rescan only reads it back.
    fn buffers_output(&self) -> bool {
        false
    }

    /// Rescans are cheap enough that materializing the operator's output buys nothing.
    fn cheaply_rescannable(&self) -> bool {
        false
    }
}

/// Physical operator of a path.
#[enum_dispatch(PathOperatorTrait)]
#[derive(Clone, Debug, PartialEq, EnumAsInner)]
pub enum PathOperator {
    SeqScan(SeqScan),
    IndexScan(IndexScan),
    WorkTableScan(WorkTableScan),
    Append(Append),
    Material(Material),
    Sort(Sort),
    Motion(Motion),
    Unique(Unique),
    NestLoop(NestLoop),
    MergeJoin(MergeJoin),
    HashJoin(HashJoin),
}

impl PathOperator {
    /// The join description of join operators.
    pub fn join(&self) -> Option<&Join> {
        match self {
            PathOperator::NestLoop(nl) => Some(nl.join()),
            PathOperator::MergeJoin(mj) => Some(mj.join()),
            PathOperator::HashJoin(hj) => Some(hj.join()),
            _ => None,
        }
    }

    pub fn is_join(&self) -> bool {
        self.join().is_some()
    }
}
