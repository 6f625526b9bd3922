//! ## Background
//!
//! A bottom-up query planner builds the plan of a multi-way join one relation set at a time.
//! Once every input relation has its candidate paths, each pair of relations that may be joined
//! gets a join relation, and the join relation gets its own candidate paths: every combination
//! of an input path, a join algorithm and an input order that might end up in the cheapest plan.
//! This crate implements that enumeration step for a massively parallel (MPP) database, where
//! rows of a relation are spread over many segments and a join may first need to move rows
//! between them.
//!
//! ## Design
//!
//! ### Paths
//!
//! A [`Path`](plan::Path) is one way of producing a relation's rows. Paths are immutable and
//! shared through reference counting, since a path is the input of many candidate joins above
//! it. Besides its costs, a path carries the sort order it produces ([pathkeys](properties::PathKeys))
//! and how its rows are spread over the cluster ([distribution](properties::Distribution)).
//!
//! ### Enumeration
//!
//! [`enumerate_join_paths`](joinpath::enumerate_join_paths) considers three algorithms:
//!
//! * merge join, either sorting both inputs or exploiting an order an input already has;
//! * nested loop, including inner index scans parameterized by the outer row;
//! * hash join, building on the inner side.
//!
//! The [path factory](pathnode::PathFactory) stamps costs on each candidate and inserts the
//! motions that co-locate the inputs. The relation's [pool](pool::PathPool) keeps only the
//! candidates no other candidate beats on startup cost, total cost, order and distribution at
//! once.
//!
//! ## Reference
//!
//! 1. Selinger, P. Griffiths, et al. "Access path selection in a relational database management
//! system." Readings in Artificial Intelligence and Databases. Morgan Kaufmann, 1989. 511-522.

#[macro_use]
extern crate prettytable;

pub mod clause;
pub mod cost;
pub mod error;
pub mod joinpath;
pub mod joinrels;
pub mod operator;
pub mod optimizer;
pub mod pathnode;
pub mod plan;
pub mod pool;
pub mod properties;
pub mod relation;
