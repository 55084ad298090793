//! Worker-visible task lists

use crate::types::{DomainId, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a task list dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskListType {
    /// Decision tasks
    Decision,
    /// Activity tasks
    Activity,
}

impl TaskListType {
    /// Stored integer form, part of the partition key
    pub fn as_i64(self) -> i64 {
        match self {
            TaskListType::Decision => 0,
            TaskListType::Activity => 1,
        }
    }
}

/// Lifetime class of a task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskListKind {
    /// Leased, authoritative queue
    #[default]
    Normal,
    /// Advisory per-worker cache that expires on its own
    Sticky,
}

/// Header of a task list partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskListInfo {
    /// Domain
    pub domain_id: DomainId,
    /// List name
    pub name: String,
    /// What the list dispatches
    pub task_type: TaskListType,
    /// Fencing token of the lease
    pub range_id: i64,
    /// Highest task id acknowledged by the owner
    pub ack_level: i64,
    /// Lifetime class
    pub kind: TaskListKind,
    /// Last update time
    pub last_updated: DateTime<Utc>,
}

/// A task enqueued on a task list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Domain of the run the task belongs to
    pub domain_id: DomainId,
    /// Workflow id of the run
    pub workflow_id: String,
    /// Run
    pub run_id: RunId,
    /// Position in the list
    pub task_id: i64,
    /// Scheduled event id
    pub schedule_id: i64,
    /// Schedule-to-start timeout in seconds; zero means no expiry
    pub schedule_to_start_timeout_secs: i32,
    /// Enqueue time
    pub created_time: DateTime<Utc>,
    /// When the task stops being deliverable, if it expires
    pub expiry: Option<DateTime<Utc>>,
}
