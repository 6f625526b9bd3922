//! Join restriction clauses.

use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::properties::EcId;
use crate::relation::{RelIds, RelSummary};

/// Identifier of a btree operator family.
pub type OpFamilyId = u32;
/// Identifier of a hash equality operator.
pub type OperatorId = u32;

/// A boolean predicate applicable at a join, with the metadata the planner cached for it.
///
/// Clauses are shared by every enumeration of a join relation and are never mutated here. Which
/// side is outer for one particular enumeration is carried by [`OrientedClause`].
#[derive(Clone, Debug, PartialEq)]
pub struct RestrictClause {
    /// Human readable form, used in explain output.
    text: String,
    left_relids: RelIds,
    right_relids: RelIds,
    can_join: bool,
    pushed_down: bool,
    merge_opfamilies: Vec<OpFamilyId>,
    hash_operator: Option<OperatorId>,
    left_ec: Option<EcId>,
    right_ec: Option<EcId>,
    /// Both operand types can be hashed by the cluster distribution function.
    redistributable: bool,
    /// `(a = b) IS NOT FALSE`, only hashable for NOT IN anti joins.
    is_not_false_test: bool,
    selectivity: f64,
}

impl RestrictClause {
    /// A plain `left op right` join clause; not mergeable or hashable until configured.
    pub fn new<S: Into<String>>(text: S, left_relids: RelIds, right_relids: RelIds) -> Self {
        Self {
            text: text.into(),
            left_relids,
            right_relids,
            can_join: true,
            pushed_down: false,
            merge_opfamilies: vec![],
            hash_operator: None,
            left_ec: None,
            right_ec: None,
            redistributable: false,
            is_not_false_test: false,
            selectivity: 0.1,
        }
    }

    /// An equality between two equivalence classes that supports merge, hash and redistribution.
    pub fn equijoin<S: Into<String>>(
        text: S,
        left: (RelIds, EcId),
        right: (RelIds, EcId),
    ) -> Self {
        Self::new(text, left.0, right.0)
            .with_merge_opfamilies([1])
            .with_eclasses(left.1, right.1)
            .with_hash_operator(1)
            .with_redistributable(true)
    }

    pub fn with_merge_opfamilies<I>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = OpFamilyId>,
    {
        self.merge_opfamilies = families.into_iter().collect();
        self
    }

    pub fn with_eclasses(mut self, left_ec: EcId, right_ec: EcId) -> Self {
        self.left_ec = Some(left_ec);
        self.right_ec = Some(right_ec);
        self
    }

    pub fn with_hash_operator(mut self, op: OperatorId) -> Self {
        self.hash_operator = Some(op);
        self
    }

    pub fn without_hash_operator(mut self) -> Self {
        self.hash_operator = None;
        self
    }

    pub fn without_merge(mut self) -> Self {
        self.merge_opfamilies.clear();
        self
    }

    pub fn with_redistributable(mut self, redistributable: bool) -> Self {
        self.redistributable = redistributable;
        self
    }

    pub fn with_can_join(mut self, can_join: bool) -> Self {
        self.can_join = can_join;
        self
    }

    pub fn with_pushed_down(mut self, pushed_down: bool) -> Self {
        self.pushed_down = pushed_down;
        self
    }

    pub fn with_not_false_test(mut self, is_not_false_test: bool) -> Self {
        self.is_not_false_test = is_not_false_test;
        self
    }

    pub fn with_selectivity(mut self, selectivity: f64) -> Self {
        self.selectivity = selectivity;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn left_relids(&self) -> RelIds {
        self.left_relids
    }

    pub fn right_relids(&self) -> RelIds {
        self.right_relids
    }

    pub fn can_join(&self) -> bool {
        self.can_join
    }

    pub fn is_pushed_down(&self) -> bool {
        self.pushed_down
    }

    pub fn is_mergeable(&self) -> bool {
        !self.merge_opfamilies.is_empty()
    }

    pub fn merge_opfamilies(&self) -> &[OpFamilyId] {
        &self.merge_opfamilies
    }

    pub fn hash_operator(&self) -> Option<OperatorId> {
        self.hash_operator
    }

    pub fn left_ec(&self) -> Option<EcId> {
        self.left_ec
    }

    pub fn right_ec(&self) -> Option<EcId> {
        self.right_ec
    }

    pub fn is_redistributable(&self) -> bool {
        self.redistributable
    }

    pub fn is_not_false_test(&self) -> bool {
        self.is_not_false_test
    }

    pub fn selectivity(&self) -> f64 {
        self.selectivity
    }

    /// Works out which side of the clause the outer relation supplies.
    ///
    /// Returns `None` when the clause's variables don't split cleanly across the two inputs.
    pub fn orientation(&self, outer_rel: &RelSummary, inner_rel: &RelSummary) -> Option<bool> {
        if self.left_relids.is_subset(outer_rel.relids())
            && self.right_relids.is_subset(inner_rel.relids())
        {
            Some(true)
        } else if self.left_relids.is_subset(inner_rel.relids())
            && self.right_relids.is_subset(outer_rel.relids())
        {
            Some(false)
        } else {
            None
        }
    }
}

impl Display for RestrictClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A clause paired with the side the outer input supplies, valid for one enumeration call.
#[derive(Clone, Debug, PartialEq)]
pub struct OrientedClause {
    clause: Rc<RestrictClause>,
    outer_is_left: bool,
}

impl OrientedClause {
    pub fn new(clause: Rc<RestrictClause>, outer_is_left: bool) -> Self {
        Self {
            clause,
            outer_is_left,
        }
    }

    pub fn clause(&self) -> &Rc<RestrictClause> {
        &self.clause
    }

    pub fn outer_is_left(&self) -> bool {
        self.outer_is_left
    }

    pub fn outer_ec(&self) -> Option<EcId> {
        if self.outer_is_left {
            self.clause.left_ec()
        } else {
            self.clause.right_ec()
        }
    }

    pub fn inner_ec(&self) -> Option<EcId> {
        if self.outer_is_left {
            self.clause.right_ec()
        } else {
            self.clause.left_ec()
        }
    }

    pub fn ec_on(&self, side: ClauseSide) -> Option<EcId> {
        match side {
            ClauseSide::Outer => self.outer_ec(),
            ClauseSide::Inner => self.inner_ec(),
        }
    }
}

impl Display for OrientedClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.clause)
    }
}

/// Join input a pathkey list is expressed over.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClauseSide {
    Outer,
    Inner,
}
