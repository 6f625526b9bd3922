//! Operators that wrap the output of their input paths.

use crate::operator::PathOperatorTrait;
use crate::properties::{MotionKind, PathKeys};

/// Buffers its input so that rescans don't recompute it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Material;

impl PathOperatorTrait for Material {
    fn name(&self) -> &'static str {
        "Material"
    }

    fn buffers_output(&self) -> bool {
        true
    }

    fn cheaply_rescannable(&self) -> bool {
        true
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
    keys: PathKeys,
}

impl Sort {
    pub fn new(keys: PathKeys) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &PathKeys {
        &self.keys
    }
}

impl PathOperatorTrait for Sort {
    fn name(&self) -> &'static str {
        "Sort"
    }

    fn detail(&self) -> String {
        format!("{}", self.keys)
    }

    fn buffers_output(&self) -> bool {
        true
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Motion {
    kind: MotionKind,
}

impl Motion {
    pub fn new(kind: MotionKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> &MotionKind {
        &self.kind
    }
}

impl PathOperatorTrait for Motion {
    fn name(&self) -> &'static str {
        "Motion"
    }

    fn detail(&self) -> String {
        format!("{}", self.kind)
    }
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum UniqueMethod {
    /// Input is known unique already.
    NoOp,
    Sort,
    Hash,
}

/// Removes duplicates from its input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unique {
    method: UniqueMethod,
}

impl Unique {
    pub fn new(method: UniqueMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> UniqueMethod {
        self.method
    }
}

impl PathOperatorTrait for Unique {
    fn name(&self) -> &'static str {
        "Unique"
    }

    fn detail(&self) -> String {
        format!("{:?}", self.method)
    }

    fn buffers_output(&self) -> bool {
        self.method != UniqueMethod::NoOp
    }

    fn cheaply_rescannable(&self) -> bool {
        matches!(self.method, UniqueMethod::Sort | UniqueMethod::Hash)
    }
}

/// Concatenates the output of its inputs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Append;

impl PathOperatorTrait for Append {
    fn name(&self) -> &'static str {
        "Append"
    }
}
