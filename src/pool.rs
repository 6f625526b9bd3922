//! The dominance pool: surviving candidate paths of one relation.
//!
//! A path `a` strictly dominates `b` when `a` is at least as cheap to start and to finish, its
//! sort order is at least as useful (`b`'s pathkeys are a prefix of `a`'s), its distribution is
//! at least as useful, and it is strictly better in at least one of those. A candidate joins the
//! pool only if nothing in the pool dominates it, and it evicts everything it dominates. Paths
//! that tie are all kept, so a pool always holds both the cheap-startup and the cheap-total
//! options higher levels of the planner may need.

use std::cmp::Ordering;

use log::{debug, trace};
use prettytable::Table;

use crate::plan::PathRef;
use crate::properties::PhysicalProp;

/// Which cost a comparison looks at first.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CostCriterion {
    Startup,
    Total,
}

/// Compares two paths on `criterion`, breaking ties with the other cost.
pub fn compare_path_costs(a: &PathRef, b: &PathRef, criterion: CostCriterion) -> Ordering {
    let startup = a.startup_cost().total_cmp(&b.startup_cost());
    let total = a.total_cost().total_cmp(&b.total_cost());
    match criterion {
        CostCriterion::Startup => startup.then(total),
        CostCriterion::Total => total.then(startup),
    }
}

/// Whether `a` strictly dominates `b`.
pub fn dominates(a: &PathRef, b: &PathRef) -> bool {
    let startup_le = a.startup_cost() <= b.startup_cost();
    let total_le = a.total_cost() <= b.total_cost();
    let keys_ge = a.pathkeys().satisfies(b.pathkeys());
    let dist_ge = a.distribution().satisfies(b.distribution());
    if !(startup_le && total_le && keys_ge && dist_ge) {
        return false;
    }

    a.startup_cost() < b.startup_cost()
        || a.total_cost() < b.total_cost()
        || a.pathkeys().len() > b.pathkeys().len()
        || !b.distribution().satisfies(a.distribution())
}

#[derive(Debug, Default)]
pub struct PathPool {
    paths: Vec<PathRef>,
    /// Candidates submitted but not yet swept.
    pending: Vec<PathRef>,
}

impl PathPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surviving paths, in admission order.
    pub fn paths(&self) -> &[PathRef] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn pending(&self) -> &[PathRef] {
        &self.pending
    }

    /// Queues a candidate; it is judged by the next [`PathPool::commit`].
    pub fn submit(&mut self, path: PathRef) {
        trace!("Submitting candidate {}", path);
        self.pending.push(path);
    }

    /// Runs the dominance sweep over every pending candidate.
    ///
    /// Returns the number of candidates admitted.
    pub fn commit(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let submitted = pending.len();
        let admitted = pending
            .into_iter()
            .filter(|path| self.add_path(path.clone()))
            .count();
        debug!(
            "Pool sweep admitted {} of {} candidates, {} paths survive",
            admitted,
            submitted,
            self.paths.len()
        );
        admitted
    }

    /// Admits `path` unless an existing path dominates it, evicting the paths it dominates.
    pub fn add_path(&mut self, path: PathRef) -> bool {
        if let Some(winner) = self.paths.iter().find(|old| dominates(old, &path)) {
            trace!("Rejected {}, dominated by {}", path, winner);
            return false;
        }

        let before = self.paths.len();
        self.paths.retain(|old| !dominates(&path, old));
        trace!(
            "Admitted {}, evicted {} paths",
            path,
            before - self.paths.len()
        );
        self.paths.push(path);
        true
    }

    /// Cheapest path by `criterion`.
    pub fn cheapest(&self, criterion: CostCriterion) -> Option<&PathRef> {
        self.paths
            .iter()
            .min_by(|a, b| compare_path_costs(a, b, criterion))
    }

    /// Cheapest path already sorted well enough for `pathkeys`.
    pub fn cheapest_for_pathkeys(
        &self,
        pathkeys: &crate::properties::PathKeys,
        criterion: CostCriterion,
    ) -> Option<&PathRef> {
        self.paths
            .iter()
            .filter(|p| p.pathkeys().satisfies(pathkeys))
            .min_by(|a, b| compare_path_costs(a, b, criterion))
    }

    /// Renders the surviving paths, one tree after another.
    pub fn explain(&self) -> Table {
        let mut table = Table::new();
        table.set_titles(row![
            "id", "operator", "pathkeys", "distribution", "rows", "startup", "total"
        ]);
        for path in &self.paths {
            path.explain_into(&mut table, 0);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::PathCosts;
    use crate::operator::SeqScan;
    use crate::plan::PathBuilder;
    use crate::properties::{Distribution, PathKey, PathKeys};
    use crate::relation::RelIds;

    fn path(id: u32, startup: f64, total: f64, keys: &[usize]) -> PathRef {
        PathBuilder::new(id, SeqScan::new("t"), RelIds::single(0))
            .with_pathkeys(keys.iter().copied().map(PathKey::asc).collect())
            .with_costs(PathCosts::new(startup, total))
            .build()
    }

    #[test]
    fn test_dominance() {
        let cheap = path(0, 0.0, 10.0, &[]);
        let dear = path(1, 0.0, 20.0, &[]);
        let sorted_dear = path(2, 0.0, 20.0, &[0]);
        let late = path(3, 5.0, 8.0, &[]);

        assert!(dominates(&cheap, &dear));
        assert!(!dominates(&dear, &cheap));
        assert!(!dominates(&cheap, &sorted_dear));
        assert!(dominates(&sorted_dear, &dear));
        assert!(!dominates(&cheap, &late));
        assert!(!dominates(&late, &cheap));
        assert!(!dominates(&cheap, &cheap));
    }

    #[test]
    fn test_distribution_must_match() {
        let rel = RelIds::single(0);
        let entry = PathBuilder::new(0, SeqScan::new("t"), rel)
            .with_costs(PathCosts::new(0.0, 10.0))
            .build();
        let hashed = PathBuilder::new(1, SeqScan::new("t"), rel)
            .with_distribution(Distribution::hashed([0]))
            .with_costs(PathCosts::new(0.0, 20.0))
            .build();

        assert!(!dominates(&entry, &hashed));
        assert!(!dominates(&hashed, &entry));
    }

    #[test]
    fn test_add_path_evicts_dominated() {
        let mut pool = PathPool::new();
        assert!(pool.add_path(path(0, 0.0, 20.0, &[])));
        assert!(pool.add_path(path(1, 5.0, 8.0, &[])));
        assert!(pool.add_path(path(2, 0.0, 10.0, &[])));
        assert!(!pool.add_path(path(3, 0.0, 15.0, &[])));

        let ids: Vec<u32> = pool.paths().iter().map(|p| p.id()).collect();
        assert_eq!(vec![1, 2], ids);
    }

    #[test]
    fn test_ties_are_kept() {
        let mut pool = PathPool::new();
        assert!(pool.add_path(path(0, 0.0, 10.0, &[])));
        assert!(pool.add_path(path(1, 0.0, 10.0, &[])));
        assert_eq!(2, pool.len());
    }

    #[test]
    fn test_commit_is_order_independent() {
        let candidates = vec![
            path(0, 0.0, 20.0, &[]),
            path(1, 5.0, 8.0, &[]),
            path(2, 0.0, 10.0, &[0]),
            path(3, 0.0, 15.0, &[]),
            path(4, 6.0, 9.0, &[0, 1]),
        ];

        let mut forward = PathPool::new();
        candidates.iter().cloned().for_each(|p| forward.submit(p));
        assert_eq!(0, forward.len());
        forward.commit();

        let mut backward = PathPool::new();
        candidates.iter().rev().cloned().for_each(|p| backward.submit(p));
        backward.commit();

        let mut f: Vec<u32> = forward.paths().iter().map(|p| p.id()).collect();
        let mut b: Vec<u32> = backward.paths().iter().map(|p| p.id()).collect();
        f.sort_unstable();
        b.sort_unstable();
        assert_eq!(f, b);
        assert_eq!(vec![1, 2, 4], f);
        assert!(forward.pending().is_empty());
    }

    #[test]
    fn test_cheapest_for_pathkeys() {
        let mut pool = PathPool::new();
        pool.add_path(path(0, 0.0, 10.0, &[]));
        pool.add_path(path(1, 0.0, 30.0, &[0, 1]));
        pool.add_path(path(2, 1.0, 20.0, &[0]));

        let a: PathKeys = [PathKey::asc(0)].into_iter().collect();
        let ab: PathKeys = [PathKey::asc(0), PathKey::asc(1)].into_iter().collect();
        assert_eq!(
            2,
            pool.cheapest_for_pathkeys(&a, CostCriterion::Total).unwrap().id()
        );
        assert_eq!(
            1,
            pool.cheapest_for_pathkeys(&a, CostCriterion::Startup).unwrap().id()
        );
        assert_eq!(
            1,
            pool.cheapest_for_pathkeys(&ab, CostCriterion::Total).unwrap().id()
        );
        assert_eq!(0, pool.cheapest(CostCriterion::Total).unwrap().id());
    }
}
