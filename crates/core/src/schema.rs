//! Persisted schema contract
//!
//! Table names, column names, row-type tags and the reserved sentinel ids
//! used to co-locate shard and queue rows with execution rows in the same
//! partition. Changing any of these is a data migration, not a code change.
//!
//! ## Layout
//!
//! `executions` is partitioned by shard id. Its clustering key is
//! `[type, domain_id, workflow_id, run_id, visibility_ts, task_id]`:
//!
//! | Row | type | domain / workflow / run | visibility_ts | task_id |
//! |-----|------|-------------------------|---------------|---------|
//! | shard | 0 | shard sentinels | default | -11 |
//! | current pointer | 1 | real ids, permanent run id | default | -10 |
//! | run | 1 | real ids | default | -10 |
//! | transfer task | 2 | transfer sentinels | default | task id |
//! | timer task | 3 | timer sentinels | fire time | task id |
//! | replication task | 4 | replication sentinels | default | task id |
//!
//! `tasks` is partitioned by `(domain_id, name, task_type)` with clustering
//! key `[type, task_id]`: the task-list row has type 1 and a fixed task id,
//! task rows have type 0.

use crate::types::{DomainId, RunId};
use crate::value::{ClusteringKey, KeyPart, PartitionKey};
use once_cell::sync::Lazy;
use std::sync::Arc;
use uuid::Uuid;

/// Table holding shards, executions and the engine-internal queues
pub const EXECUTIONS_TABLE: &str = "executions";

/// Table holding task lists and their tasks
pub const TASKS_TABLE: &str = "tasks";

/// Column names
pub mod columns {
    #![allow(missing_docs)]

    // executions
    pub const SHARD: &str = "shard";
    pub const RANGE_ID: &str = "range_id";
    pub const CURRENT_RUN_ID: &str = "current_run_id";
    pub const EXECUTION: &str = "execution";
    pub const REPLICATION_STATE: &str = "replication_state";
    pub const VERSION_HISTORIES: &str = "version_histories";
    pub const VERSION_HISTORIES_ENCODING: &str = "version_histories_encoding";
    pub const WORKFLOW_LAST_WRITE_VERSION: &str = "workflow_last_write_version";
    pub const WORKFLOW_STATE: &str = "workflow_state";
    pub const NEXT_EVENT_ID: &str = "next_event_id";
    pub const ACTIVITY_MAP: &str = "activity_map";
    pub const TIMER_MAP: &str = "timer_map";
    pub const CHILD_EXECUTIONS_MAP: &str = "child_executions_map";
    pub const REQUEST_CANCEL_MAP: &str = "request_cancel_map";
    pub const SIGNAL_MAP: &str = "signal_map";
    pub const SIGNAL_REQUESTED: &str = "signal_requested";
    pub const BUFFERED_EVENTS_LIST: &str = "buffered_events_list";
    pub const TRANSFER: &str = "transfer";
    pub const TIMER: &str = "timer";
    pub const REPLICATION: &str = "replication";

    // tasks
    pub const TASK_LIST: &str = "task_list";
    pub const TASK: &str = "task";
}

/// Row-type tag of the `executions` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowType {
    /// Shard record
    Shard = 0,
    /// Run record or current pointer
    Execution = 1,
    /// Transfer queue entry
    TransferTask = 2,
    /// Timer queue entry
    TimerTask = 3,
    /// Replication queue entry
    ReplicationTask = 4,
}

impl RowType {
    /// Stored tag value
    pub fn tag(self) -> i64 {
        self as i64
    }

    /// Decode a stored tag
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(RowType::Shard),
            1 => Some(RowType::Execution),
            2 => Some(RowType::TransferTask),
            3 => Some(RowType::TimerTask),
            4 => Some(RowType::ReplicationTask),
            _ => None,
        }
    }
}

/// Row-type tag of the `tasks` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskRowType {
    /// Enqueued task
    Task = 0,
    /// Task-list header row
    TaskList = 1,
}

/// Reserved ids of one row family that shares the shard partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelIds {
    /// Placeholder domain id
    pub domain_id: Uuid,
    /// Placeholder workflow id
    pub workflow_id: String,
    /// Placeholder run id
    pub run_id: Uuid,
}

impl SentinelIds {
    fn new(domain_id: u128, workflow_id: u128, run_id: u128) -> Self {
        Self {
            domain_id: Uuid::from_u128(domain_id),
            workflow_id: Uuid::from_u128(workflow_id).to_string(),
            run_id: Uuid::from_u128(run_id),
        }
    }

    fn prefix(&self, row_type: RowType) -> Vec<KeyPart> {
        vec![
            KeyPart::Int(row_type.tag()),
            KeyPart::Uuid(self.domain_id),
            KeyPart::Text(self.workflow_id.clone()),
            KeyPart::Uuid(self.run_id),
        ]
    }
}

/// Immutable table of reserved ids and layout constants
///
/// Built once per process and shared by `Arc` with every store. Nothing
/// mutates it after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaConstants {
    /// Domain id stored when a run has no parent
    pub empty_domain_id: Uuid,
    /// Run id stored when a run has no parent
    pub empty_run_id: Uuid,
    /// Run id slot occupied by the current-execution pointer
    pub permanent_run_id: Uuid,
    /// Sentinels of the shard row
    pub shard: SentinelIds,
    /// Sentinels of transfer task rows
    pub transfer: SentinelIds,
    /// Sentinels of timer task rows
    pub timer: SentinelIds,
    /// Sentinels of replication task rows
    pub replication: SentinelIds,
    /// `task_id` of run and current-pointer rows
    pub row_type_execution_task_id: i64,
    /// `task_id` of the shard row
    pub row_type_shard_task_id: i64,
    /// Initiated id stored when a run has no parent
    pub empty_initiated_id: i64,
    /// `task_id` of the task-list header row
    pub task_list_task_id: i64,
    /// Range id of a freshly created task list
    pub initial_range_id: i64,
    /// `visibility_ts` of every row that is not a timer (ms since epoch)
    pub default_visibility_timestamp_ms: i64,
    /// Largest TTL the backing store accepts
    pub max_ttl_secs: i64,
}

static V1: Lazy<Arc<SchemaConstants>> = Lazy::new(|| Arc::new(SchemaConstants::build_v1()));

impl SchemaConstants {
    /// The process-wide v1 table
    pub fn v1() -> Arc<SchemaConstants> {
        Arc::clone(&V1)
    }

    fn build_v1() -> Self {
        Self {
            empty_domain_id: Uuid::from_u128(0x10000000_0000_f000_f000_000000000000),
            empty_run_id: Uuid::from_u128(0x30000000_0000_f000_f000_000000000000),
            permanent_run_id: Uuid::from_u128(0x30000000_0000_f000_f000_000000000001),
            shard: SentinelIds::new(
                0x10000000_1000_f000_f000_000000000000,
                0x20000000_1000_f000_f000_000000000000,
                0x30000000_1000_f000_f000_000000000000,
            ),
            transfer: SentinelIds::new(
                0x10000000_3000_f000_f000_000000000000,
                0x20000000_3000_f000_f000_000000000000,
                0x30000000_3000_f000_f000_000000000000,
            ),
            timer: SentinelIds::new(
                0x10000000_4000_f000_f000_000000000000,
                0x20000000_4000_f000_f000_000000000000,
                0x30000000_4000_f000_f000_000000000000,
            ),
            replication: SentinelIds::new(
                0x10000000_5000_f000_f000_000000000000,
                0x20000000_5000_f000_f000_000000000000,
                0x30000000_5000_f000_f000_000000000000,
            ),
            row_type_execution_task_id: -10,
            row_type_shard_task_id: -11,
            empty_initiated_id: -7,
            task_list_task_id: -12345,
            initial_range_id: 1,
            // 2000-01-01T00:00:00Z
            default_visibility_timestamp_ms: 946_684_800_000,
            // 20 years
            max_ttl_secs: 630_720_000,
        }
    }

    // ========================================================================
    // executions table
    // ========================================================================

    /// Partition holding everything owned by `shard_id`
    pub fn shard_partition(&self, shard_id: i32) -> PartitionKey {
        PartitionKey::new(vec![KeyPart::Int(shard_id as i64)])
    }

    /// Key of the shard row
    pub fn shard_row_key(&self) -> ClusteringKey {
        let mut parts = self.shard.prefix(RowType::Shard);
        parts.push(KeyPart::Timestamp(self.default_visibility_timestamp_ms));
        parts.push(KeyPart::Int(self.row_type_shard_task_id));
        ClusteringKey::new(parts)
    }

    /// Key of the run row `(domain_id, workflow_id, run_id)`
    pub fn execution_row_key(
        &self,
        domain_id: DomainId,
        workflow_id: &str,
        run_id: RunId,
    ) -> ClusteringKey {
        self.execution_key(domain_id, workflow_id, run_id.as_uuid())
    }

    /// Key of the current-execution pointer of `(domain_id, workflow_id)`
    pub fn current_row_key(&self, domain_id: DomainId, workflow_id: &str) -> ClusteringKey {
        self.execution_key(domain_id, workflow_id, self.permanent_run_id)
    }

    fn execution_key(&self, domain_id: DomainId, workflow_id: &str, run_id: Uuid) -> ClusteringKey {
        ClusteringKey::new(vec![
            KeyPart::Int(RowType::Execution.tag()),
            KeyPart::Uuid(domain_id.as_uuid()),
            KeyPart::Text(workflow_id.to_string()),
            KeyPart::Uuid(run_id),
            KeyPart::Timestamp(self.default_visibility_timestamp_ms),
            KeyPart::Int(self.row_type_execution_task_id),
        ])
    }

    /// Whether `key` addresses a current-execution pointer
    pub fn is_current_row(&self, key: &ClusteringKey) -> bool {
        key.part(0) == Some(&KeyPart::Int(RowType::Execution.tag()))
            && key.part(3) == Some(&KeyPart::Uuid(self.permanent_run_id))
    }

    /// Row type of an `executions` row
    pub fn row_type_of(&self, key: &ClusteringKey) -> Option<RowType> {
        key.part(0)
            .and_then(KeyPart::as_int)
            .and_then(RowType::from_tag)
    }

    /// Key of a transfer task
    pub fn transfer_task_key(&self, task_id: i64) -> ClusteringKey {
        let mut parts = self.transfer_task_prefix();
        parts.push(KeyPart::Int(task_id));
        ClusteringKey::new(parts)
    }

    /// Prefix shared by all transfer tasks; the next component is the task id
    pub fn transfer_task_prefix(&self) -> Vec<KeyPart> {
        let mut parts = self.transfer.prefix(RowType::TransferTask);
        parts.push(KeyPart::Timestamp(self.default_visibility_timestamp_ms));
        parts
    }

    /// Key of a replication task
    pub fn replication_task_key(&self, task_id: i64) -> ClusteringKey {
        let mut parts = self.replication_task_prefix();
        parts.push(KeyPart::Int(task_id));
        ClusteringKey::new(parts)
    }

    /// Prefix shared by all replication tasks; the next component is the task id
    pub fn replication_task_prefix(&self) -> Vec<KeyPart> {
        let mut parts = self.replication.prefix(RowType::ReplicationTask);
        parts.push(KeyPart::Timestamp(self.default_visibility_timestamp_ms));
        parts
    }

    /// Key of a timer task
    pub fn timer_task_key(&self, visibility_ms: i64, task_id: i64) -> ClusteringKey {
        let mut parts = self.timer_task_prefix();
        parts.push(KeyPart::Timestamp(visibility_ms));
        parts.push(KeyPart::Int(task_id));
        ClusteringKey::new(parts)
    }

    /// Prefix shared by all timer tasks; the next component is the fire time
    pub fn timer_task_prefix(&self) -> Vec<KeyPart> {
        self.timer.prefix(RowType::TimerTask)
    }

    // ========================================================================
    // tasks table
    // ========================================================================

    /// Partition of one task list
    pub fn task_list_partition(
        &self,
        domain_id: DomainId,
        name: &str,
        task_type: i64,
    ) -> PartitionKey {
        PartitionKey::new(vec![
            KeyPart::Uuid(domain_id.as_uuid()),
            KeyPart::Text(name.to_string()),
            KeyPart::Int(task_type),
        ])
    }

    /// Key of the task-list header row
    pub fn task_list_row_key(&self) -> ClusteringKey {
        ClusteringKey::new(vec![
            KeyPart::Int(TaskRowType::TaskList as i64),
            KeyPart::Int(self.task_list_task_id),
        ])
    }

    /// Key of a task row
    pub fn task_row_key(&self, task_id: i64) -> ClusteringKey {
        let mut parts = self.task_row_prefix();
        parts.push(KeyPart::Int(task_id));
        ClusteringKey::new(parts)
    }

    /// Prefix shared by all task rows; the next component is the task id
    pub fn task_row_prefix(&self) -> Vec<KeyPart> {
        vec![KeyPart::Int(TaskRowType::Task as i64)]
    }
}
