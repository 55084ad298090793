//! Engine-internal queue entries
//!
//! Transfer, timer and replication tasks live in the shard partition next to
//! the runs that produced them. They are only ever written inside the batch
//! that mutates their run, and deleted once processed.

use crate::types::{DomainId, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::execution::ReplicationInfo;

/// Kind of transfer task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferTaskType {
    /// Dispatch a decision task
    DecisionTask,
    /// Dispatch an activity task
    ActivityTask,
    /// Post-close processing
    CloseExecution,
    /// Cancel another run
    CancelExecution,
    /// Start a child run
    StartChildExecution,
    /// Signal another run
    SignalExecution,
    /// Record the run as started in visibility
    RecordWorkflowStarted,
    /// Reset the run
    ResetWorkflow,
    /// Update visibility search attributes
    UpsertWorkflowSearchAttributes,
}

/// Kind of timer task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerTaskType {
    /// Decision start-to-close or schedule-to-start timeout
    DecisionTimeout,
    /// Activity timeout
    ActivityTimeout,
    /// User timer
    UserTimer,
    /// Workflow run timeout
    WorkflowTimeout,
    /// Retention expiry
    DeleteHistoryEvent,
    /// Activity retry backoff
    ActivityRetryTimer,
    /// Workflow retry or cron backoff
    WorkflowBackoffTimer,
}

/// Kind of replication task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplicationTaskType {
    /// Ship a history range
    History,
    /// Sync activity heartbeat state
    SyncActivity,
    /// Failover marker
    FailoverMarker,
}

/// A transfer queue entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTaskInfo {
    /// Domain of the producing run
    pub domain_id: DomainId,
    /// Workflow id of the producing run
    pub workflow_id: String,
    /// Producing run
    pub run_id: RunId,
    /// Queue position, monotonic per shard
    pub task_id: i64,
    /// Kind
    pub task_type: TransferTaskType,
    /// Domain of the run the task acts on
    pub target_domain_id: DomainId,
    /// Workflow id of the run the task acts on
    pub target_workflow_id: String,
    /// Run the task acts on, if pinned
    pub target_run_id: Option<RunId>,
    /// Restrict cross-run actions to the child
    pub target_child_workflow_only: bool,
    /// Task list for dispatch
    pub task_list: String,
    /// Scheduled event id
    pub schedule_id: i64,
    /// Failover version
    pub version: i64,
    /// Creation time
    pub visibility_timestamp: DateTime<Utc>,
    /// Whether to record visibility on completion
    pub record_visibility: bool,
}

/// A timer queue entry, ordered by fire time then task id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerTaskInfo {
    /// Domain of the producing run
    pub domain_id: DomainId,
    /// Workflow id of the producing run
    pub workflow_id: String,
    /// Producing run
    pub run_id: RunId,
    /// Fire time
    pub visibility_timestamp: DateTime<Utc>,
    /// Tie-breaker among timers firing at the same instant
    pub task_id: i64,
    /// Kind
    pub task_type: TimerTaskType,
    /// Which timeout fired, for timeout timers
    pub timeout_type: i32,
    /// Event id the timer refers to
    pub event_id: i64,
    /// Attempt the timer was created for
    pub schedule_attempt: i64,
    /// Failover version
    pub version: i64,
}

/// A replication queue entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationTaskInfo {
    /// Domain of the producing run
    pub domain_id: DomainId,
    /// Workflow id of the producing run
    pub workflow_id: String,
    /// Producing run
    pub run_id: RunId,
    /// Queue position, monotonic per shard
    pub task_id: i64,
    /// Kind
    pub task_type: ReplicationTaskType,
    /// First event id of the shipped range
    pub first_event_id: i64,
    /// Next event id after the shipped range
    pub next_event_id: i64,
    /// Failover version
    pub version: i64,
    /// Per-cluster replication positions at creation
    #[serde(default)]
    pub last_replication_info: BTreeMap<String, ReplicationInfo>,
    /// Scheduled event id, for activity syncs
    pub scheduled_id: i64,
    /// History branch of the run
    pub branch_token: Vec<u8>,
    /// Whether the shipped range resets the run
    pub reset_workflow: bool,
    /// History branch of the new run, for continue-as-new
    pub new_run_branch_token: Vec<u8>,
}

/// Queue entries derived from one mutation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tasks {
    /// Transfer entries
    pub transfer: Vec<TransferTaskInfo>,
    /// Timer entries
    pub timer: Vec<TimerTaskInfo>,
    /// Replication entries
    pub replication: Vec<ReplicationTaskInfo>,
}

impl Tasks {
    /// No entries
    pub fn none() -> Self {
        Self::default()
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.transfer.len() + self.timer.len() + self.replication.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
