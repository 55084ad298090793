//! Transfer, timer and replication queues of a shard
//!
//! Entries are only ever written by the execution store, inside the batch
//! that mutates their run. This store reads them in pages and deletes them
//! once processed.
//!
//! | Queue | Read range | Range delete |
//! |-------|------------|--------------|
//! | transfer | `read_level < task_id <= max_read_level` | `(begin, end]` |
//! | replication | `read_level < task_id <= max_read_level` | `(begin, end]` |
//! | timer | `min <= visibility < max` | `[begin, end)` |
//!
//! Page tokens are opaque and passed back to the backend unchanged.
//! Deleting entries that are already gone is not an error.

use crate::codec::decode_doc;
use crate::config::PersistenceConfig;
use crate::errors::{read_error, write_error};
use chrono::{DateTime, Utc};
use fencepost_core::records::{ReplicationTaskInfo, TimerTaskInfo, TransferTaskInfo};
use fencepost_core::schema::{columns, EXECUTIONS_TABLE};
use fencepost_core::value::ColumnName;
use fencepost_core::{ClusteringKey, KeyPart, Result, SchemaConstants};
use fencepost_storage::{KeyRange, RangeQuery, Statement, WideColumnStore};
use serde::de::DeserializeOwned;
use std::ops::Bound;
use std::sync::Arc;
use tracing::debug;

/// Page request over a queue ordered by task id
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetQueueTasksRequest {
    /// Exclusive lower bound
    pub read_level: i64,
    /// Inclusive upper bound
    pub max_read_level: i64,
    /// Maximum entries per page; zero uses the configured default
    pub batch_size: usize,
    /// Token from the previous page
    pub next_page_token: Option<Vec<u8>>,
}

/// Page request over the timer queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetTimerIndexTasksRequest {
    /// Inclusive lower bound
    pub min_timestamp: DateTime<Utc>,
    /// Exclusive upper bound
    pub max_timestamp: DateTime<Utc>,
    /// Maximum entries per page; zero uses the configured default
    pub batch_size: usize,
    /// Token from the previous page
    pub next_page_token: Option<Vec<u8>>,
}

/// One page of queue entries
#[derive(Debug, Clone, PartialEq)]
pub struct QueuePage<T> {
    /// Entries in queue order
    pub tasks: Vec<T>,
    /// Token for the next page; `None` when exhausted
    pub next_page_token: Option<Vec<u8>>,
}

/// Queue reads and completions of one shard
pub struct QueueStore {
    shard_id: i32,
    backend: Arc<dyn WideColumnStore>,
    schema: Arc<SchemaConstants>,
    config: Arc<PersistenceConfig>,
}

impl QueueStore {
    /// Create a store for `shard_id`
    pub fn new(
        shard_id: i32,
        backend: Arc<dyn WideColumnStore>,
        schema: Arc<SchemaConstants>,
        config: Arc<PersistenceConfig>,
    ) -> Self {
        Self {
            shard_id,
            backend,
            schema,
            config,
        }
    }

    fn range(&self, prefix: Vec<KeyPart>, lower: Bound<KeyPart>, upper: Bound<KeyPart>) -> KeyRange {
        KeyRange {
            table: EXECUTIONS_TABLE,
            partition: self.schema.shard_partition(self.shard_id),
            prefix,
            lower,
            upper,
        }
    }

    fn read_page<T: DeserializeOwned>(
        &self,
        operation: &str,
        range: KeyRange,
        column: ColumnName,
        batch_size: usize,
        page_token: &Option<Vec<u8>>,
    ) -> Result<QueuePage<T>> {
        let query = RangeQuery {
            range,
            page_size: self.config.page_size(batch_size),
            page_token: page_token.clone(),
        };
        let page = self
            .backend
            .scan(&query)
            .map_err(|e| read_error(operation, e))?;
        let tasks = page
            .rows
            .iter()
            .map(|row| decode_doc(row, column))
            .collect::<Result<Vec<T>>>()?;
        Ok(QueuePage {
            tasks,
            next_page_token: page.next_page_token,
        })
    }

    fn delete_one(&self, operation: &str, key: ClusteringKey) -> Result<()> {
        let statement = Statement::delete(
            EXECUTIONS_TABLE,
            self.schema.shard_partition(self.shard_id),
            key,
        );
        self.backend
            .execute(statement)
            .map_err(|e| write_error(operation, e))?;
        Ok(())
    }

    fn delete_range(&self, operation: &str, range: KeyRange) -> Result<()> {
        debug!(shard_id = self.shard_id, operation, "range delete");
        self.backend
            .delete_range(&range)
            .map_err(|e| write_error(operation, e))
    }

    fn id_range(&self, prefix: Vec<KeyPart>, exclusive_begin: i64, inclusive_end: i64) -> KeyRange {
        self.range(
            prefix,
            Bound::Excluded(KeyPart::Int(exclusive_begin)),
            Bound::Included(KeyPart::Int(inclusive_end)),
        )
    }

    fn timer_range(&self, inclusive_begin: DateTime<Utc>, exclusive_end: DateTime<Utc>) -> KeyRange {
        self.range(
            self.schema.timer_task_prefix(),
            Bound::Included(KeyPart::Timestamp(inclusive_begin.timestamp_millis())),
            Bound::Excluded(KeyPart::Timestamp(exclusive_end.timestamp_millis())),
        )
    }

    // ========================================================================
    // Transfer
    // ========================================================================

    /// Read a page of transfer tasks
    pub fn get_transfer_tasks(
        &self,
        request: &GetQueueTasksRequest,
    ) -> Result<QueuePage<TransferTaskInfo>> {
        self.read_page(
            "GetTransferTasks",
            self.id_range(
                self.schema.transfer_task_prefix(),
                request.read_level,
                request.max_read_level,
            ),
            columns::TRANSFER,
            request.batch_size,
            &request.next_page_token,
        )
    }

    /// Delete one transfer task
    pub fn complete_transfer_task(&self, task_id: i64) -> Result<()> {
        self.delete_one("CompleteTransferTask", self.schema.transfer_task_key(task_id))
    }

    /// Delete transfer tasks with `exclusive_begin < task_id <= inclusive_end`
    pub fn range_complete_transfer_task(&self, exclusive_begin: i64, inclusive_end: i64) -> Result<()> {
        self.delete_range(
            "RangeCompleteTransferTask",
            self.id_range(self.schema.transfer_task_prefix(), exclusive_begin, inclusive_end),
        )
    }

    // ========================================================================
    // Replication
    // ========================================================================

    /// Read a page of replication tasks
    pub fn get_replication_tasks(
        &self,
        request: &GetQueueTasksRequest,
    ) -> Result<QueuePage<ReplicationTaskInfo>> {
        self.read_page(
            "GetReplicationTasks",
            self.id_range(
                self.schema.replication_task_prefix(),
                request.read_level,
                request.max_read_level,
            ),
            columns::REPLICATION,
            request.batch_size,
            &request.next_page_token,
        )
    }

    /// Delete one replication task
    pub fn complete_replication_task(&self, task_id: i64) -> Result<()> {
        self.delete_one(
            "CompleteReplicationTask",
            self.schema.replication_task_key(task_id),
        )
    }

    /// Delete replication tasks with `exclusive_begin < task_id <= inclusive_end`
    pub fn range_complete_replication_task(
        &self,
        exclusive_begin: i64,
        inclusive_end: i64,
    ) -> Result<()> {
        self.delete_range(
            "RangeCompleteReplicationTask",
            self.id_range(
                self.schema.replication_task_prefix(),
                exclusive_begin,
                inclusive_end,
            ),
        )
    }

    // ========================================================================
    // Timer
    // ========================================================================

    /// Read a page of timers due in `[min_timestamp, max_timestamp)`
    pub fn get_timer_index_tasks(
        &self,
        request: &GetTimerIndexTasksRequest,
    ) -> Result<QueuePage<TimerTaskInfo>> {
        self.read_page(
            "GetTimerIndexTasks",
            self.timer_range(request.min_timestamp, request.max_timestamp),
            columns::TIMER,
            request.batch_size,
            &request.next_page_token,
        )
    }

    /// Delete one timer
    pub fn complete_timer_task(&self, visibility_timestamp: DateTime<Utc>, task_id: i64) -> Result<()> {
        self.delete_one(
            "CompleteTimerTask",
            self.schema
                .timer_task_key(visibility_timestamp.timestamp_millis(), task_id),
        )
    }

    /// Delete timers due in `[inclusive_begin, exclusive_end)`
    pub fn range_complete_timer_task(
        &self,
        inclusive_begin: DateTime<Utc>,
        exclusive_end: DateTime<Utc>,
    ) -> Result<()> {
        self.delete_range(
            "RangeCompleteTimerTask",
            self.timer_range(inclusive_begin, exclusive_end),
        )
    }
}

impl std::fmt::Debug for QueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueStore")
            .field("shard_id", &self.shard_id)
            .finish()
    }
}
