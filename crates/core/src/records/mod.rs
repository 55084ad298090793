//! Typed entity records
//!
//! Everything a store returns or accepts is one of these types. Stored rows
//! are decoded into them once, at the engine boundary.

pub mod collections;
pub mod execution;
pub mod shard;
pub mod task_list;
pub mod tasks;

pub use collections::{ActivityInfo, ChildExecutionInfo, RequestCancelInfo, SignalInfo, TimerInfo};
pub use execution::{
    CloseStatus, CurrentExecution, DecisionInfo, ParentExecution, ReplicationInfo,
    ReplicationMode, ReplicationState, RetryPolicyInfo, WorkflowExecutionInfo,
    WorkflowMutableState, WorkflowState,
};
pub use shard::ShardRecord;
pub use task_list::{TaskInfo, TaskListInfo, TaskListKind, TaskListType};
pub use tasks::{
    ReplicationTaskInfo, ReplicationTaskType, Tasks, TimerTaskInfo, TimerTaskType,
    TransferTaskInfo, TransferTaskType,
};
