use std::rc::Rc;

use enumset::EnumSet;
use itertools::Itertools;
use strum_macros::{Display, EnumIter};

use crate::clause::{OrientedClause, RestrictClause};
use crate::operator::PathOperatorTrait;
use crate::optimizer::JoinMethod;
use crate::properties::PathKeys;

/// Join semantics.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Display, EnumIter)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    /// Left anti semi join, i.e. `NOT EXISTS`.
    LeftAntiSemi,
    /// Left anti semi join with `NOT IN` null semantics.
    LeftAntiSemiNotIn,
    /// `IN` / `EXISTS` semi join; rewritten by the caller before enumeration.
    Semi,
    /// Inner join after making the outer side unique; rewritten by the caller.
    UniqueOuter,
    /// Inner join after making the inner side unique; rewritten by the caller.
    UniqueInner,
}

impl JoinKind {
    /// Whether the enumerator can plan this kind.
    pub fn is_supported(&self) -> bool {
        !matches!(
            self,
            JoinKind::Semi | JoinKind::UniqueOuter | JoinKind::UniqueInner
        )
    }

    pub fn is_outer(&self) -> bool {
        matches!(
            self,
            JoinKind::Left
                | JoinKind::Right
                | JoinKind::Full
                | JoinKind::LeftAntiSemi
                | JoinKind::LeftAntiSemiNotIn
        )
    }

    /// Join methods able to execute this kind.
    pub fn supported_methods(&self) -> EnumSet<JoinMethod> {
        match self {
            JoinKind::Inner | JoinKind::Left | JoinKind::LeftAntiSemi => EnumSet::all(),
            // The merge join executor doesn't implement NOT IN semantics.
            JoinKind::LeftAntiSemiNotIn => JoinMethod::NestLoop | JoinMethod::HashJoin,
            JoinKind::Right | JoinKind::Full => EnumSet::only(JoinMethod::MergeJoin),
            JoinKind::Semi | JoinKind::UniqueOuter | JoinKind::UniqueInner => EnumSet::empty(),
        }
    }

    /// Right and full joins must use every merge clause as a merge key.
    pub fn requires_all_merge_clauses(&self) -> bool {
        matches!(self, JoinKind::Right | JoinKind::Full)
    }

    /// The kind to use when the inputs are swapped, if the join can be computed that way.
    pub fn commute(&self) -> Option<JoinKind> {
        match self {
            JoinKind::Inner => Some(JoinKind::Inner),
            JoinKind::Left => Some(JoinKind::Right),
            JoinKind::Right => Some(JoinKind::Left),
            JoinKind::Full => Some(JoinKind::Full),
            _ => None,
        }
    }
}

/// Join kind and restriction clauses shared by every join operator.
#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    join_kind: JoinKind,
    restrict_list: Vec<Rc<RestrictClause>>,
}

impl Join {
    pub fn new(join_kind: JoinKind, restrict_list: &[Rc<RestrictClause>]) -> Self {
        Self {
            join_kind,
            restrict_list: restrict_list.to_vec(),
        }
    }

    pub fn join_kind(&self) -> JoinKind {
        self.join_kind
    }

    pub fn restrict_list(&self) -> &[Rc<RestrictClause>] {
        &self.restrict_list
    }

    fn describe(&self) -> String {
        if self.restrict_list.is_empty() {
            format!("{}", self.join_kind)
        } else {
            format!(
                "{} on {}",
                self.join_kind,
                self.restrict_list.iter().join(" and ")
            )
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NestLoop {
    join: Join,
}

impl NestLoop {
    pub fn new(join: Join) -> Self {
        Self { join }
    }

    pub fn join(&self) -> &Join {
        &self.join
    }
}

impl PathOperatorTrait for NestLoop {
    fn name(&self) -> &'static str {
        "NestLoop"
    }

    fn detail(&self) -> String {
        self.join.describe()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MergeJoin {
    join: Join,
    merge_clauses: Vec<OrientedClause>,
    outer_sort_keys: PathKeys,
    inner_sort_keys: PathKeys,
}

impl MergeJoin {
    pub fn new(
        join: Join,
        merge_clauses: Vec<OrientedClause>,
        outer_sort_keys: PathKeys,
        inner_sort_keys: PathKeys,
    ) -> Self {
        Self {
            join,
            merge_clauses,
            outer_sort_keys,
            inner_sort_keys,
        }
    }

    pub fn join(&self) -> &Join {
        &self.join
    }

    pub fn merge_clauses(&self) -> &[OrientedClause] {
        &self.merge_clauses
    }

    /// Explicit sort requested on the outer input; empty when the outer came presorted.
    pub fn outer_sort_keys(&self) -> &PathKeys {
        &self.outer_sort_keys
    }

    pub fn inner_sort_keys(&self) -> &PathKeys {
        &self.inner_sort_keys
    }

    /// Join clauses not used as merge keys, evaluated as filters on merged rows.
    pub fn residual_clauses(&self) -> impl Iterator<Item = &Rc<RestrictClause>> {
        self.join.restrict_list.iter().filter(move |c| {
            !self
                .merge_clauses
                .iter()
                .any(|m| Rc::ptr_eq(m.clause(), c))
        })
    }
}

impl PathOperatorTrait for MergeJoin {
    fn name(&self) -> &'static str {
        "MergeJoin"
    }

    fn detail(&self) -> String {
        format!(
            "{} merge by ({})",
            self.join.join_kind,
            self.merge_clauses.iter().join(", ")
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HashJoin {
    join: Join,
    hash_clauses: Vec<OrientedClause>,
}

impl HashJoin {
    pub fn new(join: Join, hash_clauses: Vec<OrientedClause>) -> Self {
        Self { join, hash_clauses }
    }

    pub fn join(&self) -> &Join {
        &self.join
    }

    pub fn hash_clauses(&self) -> &[OrientedClause] {
        &self.hash_clauses
    }
}

impl PathOperatorTrait for HashJoin {
    fn name(&self) -> &'static str {
        "HashJoin"
    }

    fn detail(&self) -> String {
        format!(
            "{} hash by ({})",
            self.join.join_kind,
            self.hash_clauses.iter().join(", ")
        )
    }
}
