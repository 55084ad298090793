//! Workflow execution records
//!
//! A run is persisted as one wide row: the scalar [`WorkflowExecutionInfo`],
//! its [`ReplicationMode`], and the keyed sub-collections gathered in
//! [`WorkflowMutableState`]. A second row per workflow id, the
//! [`CurrentExecution`] pointer, names the run that is authoritative.

use super::collections::{
    ActivityInfo, ChildExecutionInfo, RequestCancelInfo, SignalInfo, TimerInfo,
};
use crate::blob::DataBlob;
use crate::types::{DomainId, RunId};
use crate::EMPTY_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// Lifecycle enums
// ============================================================================

/// Execution state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WorkflowState {
    /// Created, first decision not yet scheduled
    #[default]
    Created,
    /// Running
    Running,
    /// Closed
    Completed,
    /// Replicated run that must never become current
    Zombie,
}

impl WorkflowState {
    /// Stored integer form, used in CAS predicates
    pub fn as_i64(self) -> i64 {
        match self {
            WorkflowState::Created => 0,
            WorkflowState::Running => 1,
            WorkflowState::Completed => 2,
            WorkflowState::Zombie => 3,
        }
    }

    /// Decode the stored integer form
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(WorkflowState::Created),
            1 => Some(WorkflowState::Running),
            2 => Some(WorkflowState::Completed),
            3 => Some(WorkflowState::Zombie),
            _ => None,
        }
    }
}

/// How a run closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CloseStatus {
    /// Not closed
    #[default]
    None,
    /// Completed successfully
    Completed,
    /// Failed
    Failed,
    /// Canceled
    Canceled,
    /// Terminated
    Terminated,
    /// Continued as a new run
    ContinuedAsNew,
    /// Timed out
    TimedOut,
}

// ============================================================================
// Replication
// ============================================================================

/// Last replicated position from one cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationInfo {
    /// Failover version
    pub version: i64,
    /// Last event id replicated at that version
    pub last_event_id: i64,
}

/// Replication bookkeeping of a run in a global domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationState {
    /// Current failover version
    pub current_version: i64,
    /// Version the run started at
    pub start_version: i64,
    /// Version of the last write
    pub last_write_version: i64,
    /// Event id of the last write
    pub last_write_event_id: i64,
    /// Per-cluster replication positions
    #[serde(default)]
    pub last_replication_info: BTreeMap<String, ReplicationInfo>,
}

/// How a run tracks replication
///
/// The two populated arms are mutually exclusive; a stored row carrying
/// both is rejected when decoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReplicationMode {
    /// Local domain, no replication tracking
    #[default]
    Legacy,
    /// Replication state (global domains, older event store)
    ReplicationState(ReplicationState),
    /// Opaque version histories
    VersionHistories(DataBlob),
}

impl ReplicationMode {
    /// Start version written to the current pointer
    pub fn start_version(&self) -> i64 {
        match self {
            ReplicationMode::ReplicationState(state) => state.start_version,
            _ => EMPTY_VERSION,
        }
    }

    /// Last write version written to the current pointer
    pub fn last_write_version(&self) -> i64 {
        match self {
            ReplicationMode::ReplicationState(state) => state.last_write_version,
            _ => EMPTY_VERSION,
        }
    }

    /// The replication state, if present
    pub fn replication_state(&self) -> Option<&ReplicationState> {
        match self {
            ReplicationMode::ReplicationState(state) => Some(state),
            _ => None,
        }
    }
}

// ============================================================================
// Execution info
// ============================================================================

/// Parent of a child workflow run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentExecution {
    /// Parent domain
    pub domain_id: DomainId,
    /// Parent workflow id
    pub workflow_id: String,
    /// Parent run
    pub run_id: RunId,
    /// Event id in the parent that initiated this child
    pub initiated_id: i64,
}

/// Pending decision bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecisionInfo {
    /// Failover version
    pub version: i64,
    /// Scheduled event id
    pub schedule_id: i64,
    /// Started event id
    pub started_id: i64,
    /// Request id of the poll that started it
    pub request_id: String,
    /// Start-to-close timeout in seconds
    pub timeout_secs: i32,
    /// Attempt number
    pub attempt: i64,
    /// Started time (ns since epoch)
    pub started_timestamp: i64,
    /// Scheduled time (ns since epoch)
    pub scheduled_timestamp: i64,
}

/// Workflow-level retry policy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetryPolicyInfo {
    /// Current attempt
    pub attempt: i32,
    /// Whether a retry policy is set
    pub has_retry_policy: bool,
    /// Initial interval in seconds
    pub initial_interval_secs: i32,
    /// Backoff multiplier
    pub backoff_coefficient: f64,
    /// Maximum interval in seconds
    pub maximum_interval_secs: i32,
    /// Time after which no further attempt is made
    pub expiration_time: Option<DateTime<Utc>>,
    /// Maximum attempts
    pub maximum_attempts: i32,
    /// Error reasons that are never retried
    #[serde(default)]
    pub non_retriable_errors: Vec<String>,
}

/// Scalar state of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecutionInfo {
    /// Domain
    pub domain_id: DomainId,
    /// Workflow id
    pub workflow_id: String,
    /// Run
    pub run_id: RunId,
    /// Parent linkage, if this is a child run
    pub parent: Option<ParentExecution>,
    /// Batch id of the completion event
    pub completion_event_batch_id: i64,
    /// Completion event
    pub completion_event: Option<DataBlob>,
    /// Task list name
    pub task_list: String,
    /// Workflow type name
    pub workflow_type_name: String,
    /// Workflow run timeout in seconds
    pub workflow_timeout_secs: i32,
    /// Decision task timeout in seconds
    pub decision_task_timeout_secs: i32,
    /// Opaque execution context
    pub execution_context: Vec<u8>,
    /// Execution state
    pub state: WorkflowState,
    /// Close status
    pub close_status: CloseStatus,
    /// First event id of the last batch
    pub last_first_event_id: i64,
    /// Task id of the last event batch
    pub last_event_task_id: i64,
    /// Id of the next history event; the optimistic lock of the run
    pub next_event_id: i64,
    /// Last processed event id
    pub last_processed_event: i64,
    /// Start time
    pub start_time: DateTime<Utc>,
    /// Last update time
    pub last_updated_time: DateTime<Utc>,
    /// Request id of the start request
    pub create_request_id: String,
    /// Signals received
    pub signal_count: i32,
    /// History size in bytes
    pub history_size: i64,
    /// Pending decision
    pub decision: DecisionInfo,
    /// Whether cancellation was requested
    pub cancel_requested: bool,
    /// Request id of the cancellation
    pub cancel_request_id: String,
    /// Sticky task list name
    pub sticky_task_list: String,
    /// Sticky schedule-to-start timeout in seconds
    pub sticky_schedule_to_start_timeout_secs: i32,
    /// Client library version
    pub client_library_version: String,
    /// Client feature version
    pub client_feature_version: String,
    /// Client implementation
    pub client_impl: String,
    /// Auto-reset points
    pub auto_reset_points: Option<DataBlob>,
    /// Retry policy
    pub retry: RetryPolicyInfo,
    /// History branch token
    pub branch_token: Vec<u8>,
    /// Cron schedule
    pub cron_schedule: String,
    /// Expiration in seconds
    pub expiration_seconds: i32,
    /// Indexed search attributes
    #[serde(default)]
    pub search_attributes: BTreeMap<String, Vec<u8>>,
}

impl WorkflowExecutionInfo {
    /// A new run in state `Created` whose history starts at event 1
    pub fn new(domain_id: DomainId, workflow_id: impl Into<String>, run_id: RunId) -> Self {
        let now = Utc::now();
        Self {
            domain_id,
            workflow_id: workflow_id.into(),
            run_id,
            parent: None,
            completion_event_batch_id: crate::FIRST_EVENT_ID,
            completion_event: None,
            task_list: String::new(),
            workflow_type_name: String::new(),
            workflow_timeout_secs: 0,
            decision_task_timeout_secs: 0,
            execution_context: Vec::new(),
            state: WorkflowState::Created,
            close_status: CloseStatus::None,
            last_first_event_id: crate::FIRST_EVENT_ID,
            last_event_task_id: 0,
            next_event_id: crate::FIRST_EVENT_ID,
            last_processed_event: crate::EMPTY_EVENT_ID,
            start_time: now,
            last_updated_time: now,
            create_request_id: String::new(),
            signal_count: 0,
            history_size: 0,
            decision: DecisionInfo {
                version: EMPTY_VERSION,
                schedule_id: crate::EMPTY_EVENT_ID,
                started_id: crate::EMPTY_EVENT_ID,
                ..DecisionInfo::default()
            },
            cancel_requested: false,
            cancel_request_id: String::new(),
            sticky_task_list: String::new(),
            sticky_schedule_to_start_timeout_secs: 0,
            client_library_version: String::new(),
            client_feature_version: String::new(),
            client_impl: String::new(),
            auto_reset_points: None,
            retry: RetryPolicyInfo::default(),
            branch_token: Vec::new(),
            cron_schedule: String::new(),
            expiration_seconds: 0,
            search_attributes: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Full persisted state of a run
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowMutableState {
    /// Scalar state
    pub execution_info: WorkflowExecutionInfo,
    /// Replication tracking
    pub replication: ReplicationMode,
    /// Pending activities by scheduled event id
    pub activity_infos: BTreeMap<i64, ActivityInfo>,
    /// User timers by timer id
    pub timer_infos: BTreeMap<String, TimerInfo>,
    /// Child runs by initiated event id
    pub child_execution_infos: BTreeMap<i64, ChildExecutionInfo>,
    /// Outgoing cancel requests by initiated event id
    pub request_cancel_infos: BTreeMap<i64, RequestCancelInfo>,
    /// Outgoing signals by initiated event id
    pub signal_infos: BTreeMap<i64, SignalInfo>,
    /// Request ids of signals already applied
    pub signal_requested: BTreeSet<String>,
    /// Event batches buffered while a decision is in flight
    pub buffered_events: Vec<DataBlob>,
}

impl WorkflowMutableState {
    /// State with no sub-collection entries
    pub fn new(execution_info: WorkflowExecutionInfo, replication: ReplicationMode) -> Self {
        Self {
            execution_info,
            replication,
            activity_infos: BTreeMap::new(),
            timer_infos: BTreeMap::new(),
            child_execution_infos: BTreeMap::new(),
            request_cancel_infos: BTreeMap::new(),
            signal_infos: BTreeMap::new(),
            signal_requested: BTreeSet::new(),
            buffered_events: Vec::new(),
        }
    }
}

/// The current-execution pointer of a workflow id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentExecution {
    /// Run that is current
    pub run_id: RunId,
    /// Request id that created it
    pub create_request_id: String,
    /// Its state
    pub state: WorkflowState,
    /// Its close status
    pub close_status: CloseStatus,
    /// Its start version
    pub start_version: i64,
    /// Its last write version
    pub last_write_version: i64,
}
