use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use itertools::Itertools;
use smallvec::SmallVec;

use crate::properties::PhysicalProp;
use crate::relation::RelIds;

/// Index of an equivalence class in the planner's eclass list.
pub type EcId = usize;

/// One expression known to be equal to the others of its class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EcMember {
    relids: RelIds,
    is_const: bool,
}

impl EcMember {
    pub fn var(relids: RelIds) -> Self {
        Self {
            relids,
            is_const: false,
        }
    }

    pub fn constant() -> Self {
        Self {
            relids: RelIds::empty(),
            is_const: true,
        }
    }

    pub fn relids(&self) -> RelIds {
        self.relids
    }

    pub fn is_const(&self) -> bool {
        self.is_const
    }
}

/// A set of expressions known to be mutually equal at this level of the plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EquivalenceClass {
    id: EcId,
    members: Vec<EcMember>,
}

impl EquivalenceClass {
    pub fn new<I>(id: EcId, members: I) -> Self
    where
        I: IntoIterator<Item = EcMember>,
    {
        Self {
            id,
            members: members.into_iter().collect(),
        }
    }

    pub fn id(&self) -> EcId {
        self.id
    }

    pub fn members(&self) -> &[EcMember] {
        &self.members
    }

    pub fn has_const(&self) -> bool {
        self.members.iter().any(EcMember::is_const)
    }

    /// A class equated to a constant is reduced to per-relation filters, so it never appears in
    /// a canonical sort order.
    pub fn must_be_redundant(&self) -> bool {
        self.has_const() && self.members.len() > 1
    }

    /// Whether some member can be computed from `relids` alone.
    pub fn has_member_within(&self, relids: RelIds) -> bool {
        self.members
            .iter()
            .any(|m| !m.is_const && !m.relids.is_empty() && m.relids.is_subset(relids))
    }

    /// Number of members that could still be join partners above `join_relids`.
    pub fn future_join_partners(&self, join_relids: RelIds) -> usize {
        self.members
            .iter()
            .filter(|m| !m.is_const && !m.relids.overlaps(join_relids))
            .count()
    }
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Canonical sort order descriptor.
///
/// Two pathkeys are interchangeable when they reference the same equivalence class in the same
/// direction, so `eq` and `hash` ignore `nulls_first`.
#[derive(Copy, Clone, Debug)]
pub struct PathKey {
    ec: EcId,
    direction: SortDirection,
    nulls_first: bool,
}

impl PathKey {
    pub fn new(ec: EcId, direction: SortDirection, nulls_first: bool) -> Self {
        Self {
            ec,
            direction,
            nulls_first,
        }
    }

    pub fn asc(ec: EcId) -> Self {
        Self::new(ec, SortDirection::Asc, false)
    }

    pub fn desc(ec: EcId) -> Self {
        Self::new(ec, SortDirection::Desc, true)
    }

    pub fn ec(&self) -> EcId {
        self.ec
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn nulls_first(&self) -> bool {
        self.nulls_first
    }

    /// Same direction and nulls placement over another equivalence class.
    pub fn with_ec(&self, ec: EcId) -> Self {
        Self { ec, ..*self }
    }
}

impl PartialEq for PathKey {
    fn eq(&self, other: &Self) -> bool {
        self.ec == other.ec && self.direction == other.direction
    }
}

impl Eq for PathKey {}

impl Hash for PathKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ec.hash(state);
        self.direction.hash(state);
    }
}

impl Display for PathKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.direction {
            SortDirection::Asc => write!(f, "ec{}", self.ec),
            SortDirection::Desc => write!(f, "ec{} desc", self.ec),
        }
    }
}

/// Ordered list of pathkeys, the sort order of a path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PathKeys(SmallVec<[PathKey; 4]>);

impl PathKeys {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[PathKey] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathKey> {
        self.0.iter()
    }

    pub fn push(&mut self, key: PathKey) {
        self.0.push(key)
    }

    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len)
    }

    pub fn contains_ec(&self, ec: EcId) -> bool {
        self.0.iter().any(|k| k.ec == ec)
    }

    /// Whether `self` is a prefix of (or equal to) `other`, i.e. a path sorted by `other` is
    /// also sorted by `self`.
    pub fn contained_in(&self, other: &PathKeys) -> bool {
        self.len() <= other.len() && self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }

    /// Leading keys `self` shares with `other`.
    pub fn common_prefix(&self, other: &PathKeys) -> PathKeys {
        self.0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| *a)
            .collect()
    }

    /// Copy of the list with the key at `idx` moved to the front.
    pub fn rotated_to_front(&self, idx: usize) -> PathKeys {
        let mut keys = self.0.clone();
        let key = keys.remove(idx);
        keys.insert(0, key);
        PathKeys(keys)
    }
}

impl PhysicalProp for PathKeys {
    fn satisfies(&self, required: &Self) -> bool {
        required.contained_in(self)
    }
}

impl FromIterator<PathKey> for PathKeys {
    fn from_iter<T: IntoIterator<Item = PathKey>>(iter: T) -> Self {
        PathKeys(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PathKeys {
    type Item = &'a PathKey;
    type IntoIter = std::slice::Iter<'a, PathKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for PathKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}
