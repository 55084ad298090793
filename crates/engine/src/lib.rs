//! Persistence engine for fencepost
//!
//! This crate implements the stores the workflow engine talks to, on top of
//! any [`fencepost_storage::WideColumnStore`]:
//! - [`ShardStore`]: shard records and shard leases
//! - [`ExecutionStore`]: runs, current pointers and the queue entries
//!   written alongside them
//! - [`QueueStore`]: paged reads and completion of transfer, timer and
//!   replication queues
//! - [`TaskListStore`]: worker task lists and their leases
//! - [`PersistenceConfig`]: tunables loaded from TOML
//!
//! # Design
//!
//! Stores hold no locks and no mutable state. Every correctness guarantee
//! comes from the backend's single-partition conditional batches: each
//! write carries the lease token of its partition, and a rejected batch is
//! decoded into a typed [`fencepost_core::PersistenceError`].
//!
//! | Backend error | On read | On write |
//! |---------------|---------|----------|
//! | timeout | `Busy` | `AmbiguousOutcome` |
//! | throttled | `Busy` | `Busy` |
//! | other | `Internal` | `Internal` |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod codec;
pub mod config;
mod errors;
pub mod execution;
pub mod queue;
pub mod shard;
pub mod task_list;

pub use config::{ConfigError, PersistenceConfig};
pub use execution::{
    CreateWorkflowExecutionRequest, CreateWorkflowMode, CurrentRunAction, CurrentRunGuard,
    ExecutionStore, ResetMutableStateRequest, ResetWorkflowExecutionRequest,
    UpdateWorkflowExecutionRequest, WorkflowMutation, WorkflowSnapshot,
};
pub use queue::{GetQueueTasksRequest, GetTimerIndexTasksRequest, QueuePage, QueueStore};
pub use shard::ShardStore;
pub use task_list::{
    CreateTasksRequest, GetTasksRequest, LeaseTaskListRequest, RowsAffected, TaskListKey,
    TaskListStore,
};
