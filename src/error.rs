use thiserror::Error;

use crate::operator::JoinKind;
use crate::relation::RelId;

pub type OptResult<T> = anyhow::Result<T>;

/// Errors raised by join path enumeration.
///
/// Candidates the path factory refuses are not errors, they are simply dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinPathError {
    /// A full join has a join clause that can't drive a merge join, and merge join is the only
    /// operator that implements full joins.
    #[error("FULL JOIN is only supported with merge-joinable join conditions")]
    FullJoinNotMergeable,
    #[error("unrecognized join type: {0}")]
    UnrecognizedJoinKind(JoinKind),
    #[error("outer pathkeys do not match mergeclauses")]
    PathKeyMismatch,
    #[error("relation index {0} exceeds the relid set capacity")]
    RelIdOutOfRange(RelId),
}

impl JoinPathError {
    /// Whether this is a user facing "feature not supported" diagnostic rather than an internal
    /// invariant violation.
    pub fn is_feature_not_supported(&self) -> bool {
        matches!(self, JoinPathError::FullJoinNotMergeable)
    }
}
