//! Relations seen by the join enumerator.

use std::fmt::{Display, Formatter};
use std::rc::Rc;

use anyhow::bail;
use itertools::Itertools;

use crate::error::{JoinPathError, OptResult};
use crate::plan::PathRef;
use crate::pool::{CostCriterion, PathPool};
use crate::properties::Distribution;

/// Index of a base relation in the range table.
pub type RelId = u32;

/// Range table indexes a [`RelIds`] can hold are `0..MAX_RELIDS`.
pub const MAX_RELIDS: RelId = 64;

/// Set of base relations, as a bitmap over range table indexes below [`MAX_RELIDS`].
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct RelIds(u64);

impl RelIds {
    pub fn empty() -> Self {
        Self(0)
    }

    /// Set holding only `relid`.
    ///
    /// # Panics
    ///
    /// If `relid` is not below [`MAX_RELIDS`]; use [`RelIds::try_single`] for untrusted input.
    pub fn single(relid: RelId) -> Self {
        assert!(relid < MAX_RELIDS, "relid {} out of range", relid);
        Self(1 << relid)
    }

    pub fn try_single(relid: RelId) -> OptResult<Self> {
        if relid >= MAX_RELIDS {
            bail!(JoinPathError::RelIdOutOfRange(relid));
        }
        Ok(Self(1 << relid))
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, relid: RelId) -> bool {
        relid < MAX_RELIDS && self.0 & (1 << relid) != 0
    }

    pub fn is_subset(&self, other: RelIds) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn overlaps(&self, other: RelIds) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(&self, other: RelIds) -> RelIds {
        RelIds(self.0 | other.0)
    }

    pub fn difference(&self, other: RelIds) -> RelIds {
        RelIds(self.0 & !other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = RelId> + '_ {
        (0..MAX_RELIDS).filter(move |relid| self.contains(*relid))
    }
}

impl FromIterator<RelId> for RelIds {
    fn from_iter<T: IntoIterator<Item = RelId>>(iter: T) -> Self {
        iter.into_iter()
            .fold(RelIds::empty(), |acc, relid| acc.union(RelIds::single(relid)))
    }
}

impl Display for RelIds {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.iter().join(", "))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RelKind {
    Base,
    Join,
    /// Child of an appendrel, e.g. one partition of a partitioned table.
    AppendMember,
}

/// What a base relation scans.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RteKind {
    Relation,
    Subquery,
    Function,
    Values,
    WorkTable,
}

/// A relation whose paths have already been enumerated, or a join relation being enumerated.
#[derive(Debug)]
pub struct RelSummary {
    relids: RelIds,
    kind: RelKind,
    rte_kind: RteKind,
    rows: f64,
    width: u32,
    distribution_policy: Option<Distribution>,
    pool: PathPool,
    cheapest_startup: Option<PathRef>,
    cheapest_total: Option<PathRef>,
    /// Index scans parameterized by outer relations, usable as nested loop inners.
    index_paths: Vec<PathRef>,
    /// Members of an appendrel.
    children: Vec<Rc<RelSummary>>,
}

impl RelSummary {
    pub fn new(relids: RelIds, kind: RelKind) -> Self {
        Self {
            relids,
            kind,
            rte_kind: RteKind::Relation,
            rows: 0.0,
            width: 0,
            distribution_policy: None,
            pool: PathPool::new(),
            cheapest_startup: None,
            cheapest_total: None,
            index_paths: vec![],
            children: vec![],
        }
    }

    pub fn base(relid: RelId) -> Self {
        Self::new(RelIds::single(relid), RelKind::Base)
    }

    pub fn join(relids: RelIds) -> Self {
        Self::new(relids, RelKind::Join)
    }

    pub fn with_rte_kind(mut self, rte_kind: RteKind) -> Self {
        self.rte_kind = rte_kind;
        self
    }

    pub fn with_size(mut self, rows: f64, width: u32) -> Self {
        self.rows = rows;
        self.width = width;
        self
    }

    pub fn with_distribution_policy(mut self, policy: Distribution) -> Self {
        self.distribution_policy = Some(policy);
        self
    }

    pub fn relids(&self) -> RelIds {
        self.relids
    }

    pub fn kind(&self) -> RelKind {
        self.kind
    }

    pub fn rte_kind(&self) -> RteKind {
        self.rte_kind
    }

    pub fn rows(&self) -> f64 {
        self.rows
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn distribution_policy(&self) -> Option<&Distribution> {
        self.distribution_policy.as_ref()
    }

    pub fn pool(&self) -> &PathPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut PathPool {
        &mut self.pool
    }

    /// Surviving paths.
    pub fn paths(&self) -> &[PathRef] {
        self.pool.paths()
    }

    pub fn cheapest_startup_path(&self) -> Option<&PathRef> {
        self.cheapest_startup.as_ref()
    }

    pub fn cheapest_total_path(&self) -> Option<&PathRef> {
        self.cheapest_total.as_ref()
    }

    pub fn index_paths(&self) -> &[PathRef] {
        &self.index_paths
    }

    pub fn children(&self) -> &[Rc<RelSummary>] {
        &self.children
    }

    /// Offers a path to the pool immediately.
    pub fn add_path(&mut self, path: PathRef) {
        self.pool.add_path(path);
    }

    pub fn add_index_path(&mut self, path: PathRef) {
        debug_assert!(path.parent() == self.relids);
        self.index_paths.push(path);
    }

    pub fn add_child(&mut self, child: Rc<RelSummary>) {
        self.children.push(child);
    }

    /// Refreshes the cached cheapest paths from the pool.
    ///
    /// Returns false if the relation has no path at all.
    pub fn set_cheapest(&mut self) -> bool {
        self.cheapest_startup = self.pool.cheapest(CostCriterion::Startup).cloned();
        self.cheapest_total = self.pool.cheapest(CostCriterion::Total).cloned();
        self.cheapest_total.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relids() {
        let a = RelIds::single(1);
        let ab: RelIds = [1, 2].into_iter().collect();

        assert!(a.is_subset(ab));
        assert!(!ab.is_subset(a));
        assert!(a.overlaps(ab));
        assert!(!a.overlaps(RelIds::single(2)));
        assert!(RelIds::empty().is_subset(a));
        assert_eq!(ab, a.union(RelIds::single(2)));
        assert_eq!("{1, 2}", ab.to_string());
    }

    #[test]
    fn test_relid_range() {
        assert_eq!(RelIds::single(63), RelIds::try_single(63).unwrap());
        assert!(RelIds::single(63).contains(63));
        assert!(!RelIds::single(63).contains(MAX_RELIDS));

        let err = RelIds::try_single(MAX_RELIDS).unwrap_err();
        assert_eq!(
            Some(&JoinPathError::RelIdOutOfRange(MAX_RELIDS)),
            err.downcast_ref::<JoinPathError>()
        );
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_single_rejects_large_relid() {
        RelIds::single(MAX_RELIDS);
    }
}
