//! Physical properties of paths: sort order and cluster distribution.

mod distribution;

use std::fmt::Debug;
use std::hash::Hash;

pub use distribution::*;
mod order;
pub use order::*;

pub trait PhysicalProp: Debug + Hash {
    /// Tests whether self satisfies `required`.
    fn satisfies(&self, required: &Self) -> bool;
}
