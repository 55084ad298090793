//! Backing-store layer for fencepost
//!
//! This crate defines what the persistence engine needs from a wide-column
//! store and provides an in-process implementation:
//! - Statement model: statements, conditions, batches, key ranges, pages
//! - WideColumnStore: the backing-store contract
//! - BackendError: failures a store reports
//! - Clock: time source for row expiry
//! - MemoryStore: DashMap of partitions with per-partition LWT

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod clock;
pub mod memory;
pub mod statement;

pub use backend::{BackendError, BackendResult, WideColumnStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::{Fault, MemoryStore};
pub use statement::{
    Assignment, Batch, CasOutcome, Condition, KeyRange, Operation, Page, Predicate, RangeQuery,
    Statement,
};
