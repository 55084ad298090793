//! Convenient imports for fencepost.
//!
//! This module re-exports the most commonly used types so you can get started
//! with a single import:
//!
//! ```ignore
//! use fencepost::prelude::*;
//!
//! let persistence = Persistence::ephemeral();
//! let shard = persistence.shard_store().get_shard(7)?;
//! ```

// Main entry point
pub use crate::database::{Persistence, PersistenceBuilder};

// Error handling
pub use fencepost_core::{PersistenceError, Result};

// Stores
pub use fencepost_engine::{
    ExecutionStore, PersistenceConfig, QueueStore, RowsAffected, ShardStore, TaskListStore,
};

// Requests
pub use fencepost_engine::{
    CreateTasksRequest, CreateWorkflowExecutionRequest, CreateWorkflowMode, CurrentRunAction,
    CurrentRunGuard, GetQueueTasksRequest, GetTasksRequest, GetTimerIndexTasksRequest,
    LeaseTaskListRequest, ResetMutableStateRequest, ResetWorkflowExecutionRequest, TaskListKey,
    UpdateWorkflowExecutionRequest, WorkflowMutation, WorkflowSnapshot,
};

// Core types
pub use fencepost_core::{DataBlob, DomainId, EncodingType, RunId, WorkflowExecution};

// Records
pub use fencepost_core::records::{
    CloseStatus, CurrentExecution, ReplicationMode, ShardRecord, TaskInfo, TaskListInfo,
    TaskListKind, TaskListType, Tasks, WorkflowExecutionInfo, WorkflowMutableState,
    WorkflowState,
};
