//! Concurrency layer for fencepost
//!
//! This crate implements the two pieces of the optimistic-concurrency
//! protocol that do not depend on any particular entity:
//! - Fence: fencing-token lease checks appended to every leased write
//! - Classifier: turns a rejected batch and its returned rows into the
//!   precise condition that failed

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classifier;
pub mod fencing;

pub use classifier::{classify, classify_create, render_columns, Conflict, CreateExpectations, Expectations};
pub use fencing::{BrokenFence, Fence};
