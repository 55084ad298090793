//! # Fencepost
//!
//! Fenced, CAS-protected persistence for workflow engines over a
//! wide-column store.
//!
//! Fencepost stores shards, workflow runs, the queues derived from them and
//! worker task lists. Every write is a single-partition conditional batch
//! that re-checks the writer's lease token, so a process that lost its
//! lease can never overwrite the new owner's state.
//!
//! ## Quick Start
//!
//! ```ignore
//! use fencepost::prelude::*;
//!
//! let persistence = Persistence::ephemeral();
//!
//! // Acquire a shard
//! let shards = persistence.shard_store();
//! shards.create_shard(&ShardRecord::new(7, "host-a", 1))?;
//!
//! // Start a workflow on it
//! let executions = persistence.execution_store(7);
//! executions.create_workflow_execution(&CreateWorkflowExecutionRequest {
//!     range_id: 1,
//!     mode: CreateWorkflowMode::BrandNew,
//!     new_workflow: snapshot,
//! })?;
//! ```
//!
//! ## Stores
//!
//! - [`ShardStore`] - shard records and leases
//! - [`ExecutionStore`] - runs and current pointers
//! - [`QueueStore`] - transfer, timer and replication queues
//! - [`TaskListStore`] - worker task lists
//!
//! ## Errors
//!
//! Every operation returns [`PersistenceError`]. Only `Busy` and
//! `AmbiguousOutcome` may be retried blindly, and `AmbiguousOutcome` needs a
//! re-read first.

#![warn(missing_docs)]

mod database;

pub mod prelude;

// Re-export main entry points
pub use database::{Persistence, PersistenceBuilder};

// Re-export stores
pub use fencepost_engine::{
    ConfigError, ExecutionStore, PersistenceConfig, QueueStore, ShardStore, TaskListStore,
};

// Re-export errors
pub use fencepost_core::{PersistenceError, Result};

/// Request and response types of the stores
pub use fencepost_engine::{execution, queue, task_list};

/// Entity records
pub use fencepost_core::records;

/// Backing-store contract and the in-memory store
pub use fencepost_storage as storage;
