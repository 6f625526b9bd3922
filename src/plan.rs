use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::mem::swap;
use std::rc::Rc;

use prettytable::Table;

use crate::cost::{Cost, PathCosts};
use crate::operator::{PathOperator, PathOperatorTrait};
use crate::properties::{Distribution, PathKeys};
use crate::relation::RelIds;

pub type PathId = u32;

pub type PathRef = Rc<Path>;

/// One candidate physical plan for a relation.
///
/// Paths are immutable once built. Join paths hold their inputs by reference, and those inputs
/// stay owned by the pools of the input relations.
#[derive(Debug)]
pub struct Path {
    id: PathId,
    operator: PathOperator,
    inputs: Vec<PathRef>,
    parent: RelIds,
    pathkeys: PathKeys,
    distribution: Distribution,
    /// Outer relations that must supply parameters, for parameterized index scans.
    param_relids: RelIds,
    rows: f64,
    width: u32,
    startup_cost: Cost,
    total_cost: Cost,
}

/// The `eq` should ignore `id`.
impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.operator == other.operator
            && self.inputs == other.inputs
            && self.parent == other.parent
            && self.pathkeys == other.pathkeys
            && self.distribution == other.distribution
            && self.param_relids == other.param_relids
            && self.rows == other.rows
            && self.width == other.width
            && self.startup_cost == other.startup_cost
            && self.total_cost == other.total_cost
    }
}

/// Breath first iterator of a path tree.
struct BFSPathIter {
    visited: HashSet<PathId>,
    cur_level: Vec<PathRef>,
    next_level: Vec<PathRef>,
}

impl Iterator for BFSPathIter {
    type Item = PathRef;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur_level.is_empty() {
            swap(&mut self.cur_level, &mut self.next_level);
        }

        if let Some(p) = self.cur_level.pop() {
            for input in &p.inputs {
                if !self.visited.contains(&input.id) {
                    self.next_level.push(input.clone());
                    self.visited.insert(input.id);
                }
            }

            Some(p)
        } else {
            None
        }
    }
}

impl Path {
    pub fn id(&self) -> PathId {
        self.id
    }

    pub fn operator(&self) -> &PathOperator {
        &self.operator
    }

    pub fn inputs(&self) -> &[PathRef] {
        &self.inputs
    }

    pub fn parent(&self) -> RelIds {
        self.parent
    }

    pub fn pathkeys(&self) -> &PathKeys {
        &self.pathkeys
    }

    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    pub fn param_relids(&self) -> RelIds {
        self.param_relids
    }

    pub fn is_parameterized(&self) -> bool {
        !self.param_relids.is_empty()
    }

    pub fn rows(&self) -> f64 {
        self.rows
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn startup_cost(&self) -> Cost {
        self.startup_cost
    }

    pub fn total_cost(&self) -> Cost {
        self.total_cost
    }

    pub fn costs(&self) -> PathCosts {
        PathCosts {
            startup: self.startup_cost,
            total: self.total_cost,
        }
    }

    /// The outer and inner input of a join path.
    pub fn join_inputs(&self) -> Option<(&PathRef, &PathRef)> {
        if self.operator.is_join() && self.inputs.len() == 2 {
            Some((&self.inputs[0], &self.inputs[1]))
        } else {
            None
        }
    }

    /// Strips the sort, material and motion wrappers the path factory puts above join inputs.
    pub fn unwrapped(self: &Rc<Self>) -> &PathRef {
        let mut path = self;
        while matches!(
            path.operator,
            PathOperator::Sort(_) | PathOperator::Material(_) | PathOperator::Motion(_)
        ) {
            path = &path.inputs[0];
        }
        path
    }

    /// Nodes of the path tree, root first.
    pub fn bfs_iter(self: &Rc<Self>) -> impl Iterator<Item = PathRef> {
        let mut visited = HashSet::new();
        visited.insert(self.id);

        BFSPathIter {
            cur_level: vec![self.clone()],
            next_level: vec![],
            visited,
        }
    }

    /// Renders the path tree, one node per row.
    pub fn explain(&self) -> Table {
        let mut table = Table::new();
        table.set_titles(row![
            "id", "operator", "pathkeys", "distribution", "rows", "startup", "total"
        ]);
        self.explain_into(&mut table, 0);
        table
    }

    pub(crate) fn explain_into(&self, table: &mut Table, depth: usize) {
        let detail = self.operator.detail();
        let operator = if detail.is_empty() {
            format!("{}{}", "  ".repeat(depth), self.operator.name())
        } else {
            format!("{}{} {}", "  ".repeat(depth), self.operator.name(), detail)
        };
        table.add_row(row![
            self.id,
            operator,
            self.pathkeys,
            self.distribution,
            format!("{:.0}", self.rows),
            format!("{:.2}", self.startup_cost.value()),
            format!("{:.2}", self.total_cost.value())
        ]);
        for input in &self.inputs {
            input.explain_into(table, depth + 1);
        }
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}#{} (startup={:.2} total={:.2} keys={} dist={})",
            self.operator.name(),
            self.id,
            self.startup_cost.value(),
            self.total_cost.value(),
            self.pathkeys,
            self.distribution
        )
    }
}

pub struct PathBuilder {
    path: Path,
}

impl PathBuilder {
    pub fn new<O: Into<PathOperator>>(id: PathId, operator: O, parent: RelIds) -> Self {
        Self {
            path: Path {
                id,
                operator: operator.into(),
                inputs: vec![],
                parent,
                pathkeys: PathKeys::empty(),
                distribution: Distribution::default(),
                param_relids: RelIds::empty(),
                rows: 0.0,
                width: 0,
                startup_cost: Cost::zero(),
                total_cost: Cost::zero(),
            },
        }
    }

    pub fn add_inputs<I>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = PathRef>,
    {
        self.path.inputs.extend(inputs);
        self
    }

    pub fn with_pathkeys(mut self, pathkeys: PathKeys) -> Self {
        self.path.pathkeys = pathkeys;
        self
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.path.distribution = distribution;
        self
    }

    pub fn with_param_relids(mut self, param_relids: RelIds) -> Self {
        self.path.param_relids = param_relids;
        self
    }

    pub fn with_size(mut self, rows: f64, width: u32) -> Self {
        self.path.rows = rows;
        self.path.width = width;
        self
    }

    pub fn with_costs(mut self, costs: PathCosts) -> Self {
        self.path.startup_cost = costs.startup;
        self.path.total_cost = costs.total;
        self
    }

    pub fn build(self) -> PathRef {
        debug_assert!(
            self.path.startup_cost <= self.path.total_cost,
            "startup cost exceeds total cost: {}",
            self.path
        );
        Rc::new(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{Material, SeqScan};

    #[test]
    fn test_bfs_visits_every_node_once() {
        let rel = RelIds::single(0);
        let scan = PathBuilder::new(0, SeqScan::new("t"), rel)
            .with_size(10.0, 4)
            .with_costs(PathCosts::new(0.0, 10.0))
            .build();
        let mat = PathBuilder::new(1, Material, rel)
            .add_inputs([scan.clone()])
            .with_costs(PathCosts::new(0.0, 20.0))
            .build();

        let ids: Vec<PathId> = mat.bfs_iter().map(|p| p.id()).collect();
        assert_eq!(vec![1, 0], ids);
        assert!(Rc::ptr_eq(&scan, mat.unwrapped()));
    }

    #[test]
    fn test_explain_has_row_per_node() {
        let rel = RelIds::single(0);
        let scan = PathBuilder::new(0, SeqScan::new("t"), rel)
            .with_costs(PathCosts::new(0.0, 10.0))
            .build();
        let mat = PathBuilder::new(1, Material, rel)
            .add_inputs([scan])
            .with_costs(PathCosts::new(0.0, 20.0))
            .build();

        assert_eq!(2, mat.explain().len());
    }
}
