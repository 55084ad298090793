//! Keyed sub-collections of a run
//!
//! Each entry is addressable by its own key so that a mutation can upsert or
//! delete it without rewriting the rest of the row.

#![allow(missing_docs)]

use crate::blob::DataBlob;
use crate::types::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending activity, keyed by its scheduled event id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityInfo {
    pub version: i64,
    pub schedule_id: i64,
    pub scheduled_event_batch_id: i64,
    pub scheduled_event: Option<DataBlob>,
    pub scheduled_time: DateTime<Utc>,
    pub started_id: i64,
    pub started_event: Option<DataBlob>,
    pub started_time: DateTime<Utc>,
    pub activity_id: String,
    pub request_id: String,
    pub details: Vec<u8>,
    pub schedule_to_start_timeout_secs: i32,
    pub schedule_to_close_timeout_secs: i32,
    pub start_to_close_timeout_secs: i32,
    pub heartbeat_timeout_secs: i32,
    pub cancel_requested: bool,
    pub cancel_request_id: i64,
    pub last_heartbeat_updated_time: DateTime<Utc>,
    /// Bit set of created timer tasks
    pub timer_task_status: i32,
    pub attempt: i32,
    pub task_list: String,
    pub started_identity: String,
    pub has_retry_policy: bool,
    pub initial_interval_secs: i32,
    pub backoff_coefficient: f64,
    pub maximum_interval_secs: i32,
    pub expiration_time: Option<DateTime<Utc>>,
    pub maximum_attempts: i32,
    #[serde(default)]
    pub non_retriable_errors: Vec<String>,
}

/// A user timer, keyed by timer id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerInfo {
    pub version: i64,
    pub timer_id: String,
    pub started_id: i64,
    pub expiry_time: DateTime<Utc>,
    /// Task id of the backing timer task
    pub task_id: i64,
}

/// A child run, keyed by its initiated event id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildExecutionInfo {
    pub version: i64,
    pub initiated_id: i64,
    pub initiated_event_batch_id: i64,
    pub initiated_event: Option<DataBlob>,
    pub started_id: i64,
    pub started_workflow_id: String,
    pub started_run_id: Option<RunId>,
    pub started_event: Option<DataBlob>,
    pub create_request_id: String,
    pub domain_name: String,
    pub workflow_type_name: String,
}

/// An outgoing cancellation request, keyed by its initiated event id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCancelInfo {
    pub version: i64,
    pub initiated_id: i64,
    pub cancel_request_id: String,
}

/// An outgoing signal, keyed by its initiated event id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalInfo {
    pub version: i64,
    pub initiated_id: i64,
    pub signal_request_id: String,
    pub signal_name: String,
    pub input: Vec<u8>,
    pub control: Vec<u8>,
}
