//! Task list store
//!
//! Each task list is its own partition of the tasks table: one header row
//! holding the lease token and ack level, followed by the task rows ordered
//! by task id. Matching hosts own a list by leasing it; every write under
//! the lease re-checks the token in the same batch.
//!
//! # Design
//!
//! ## Lease
//!
//! A list that has never been leased is created with the initial token. A
//! list that exists is taken over by moving its token from `t` to `t + 1`.
//! A caller renewing a lease it believes it holds passes its token; if the
//! stored token differs someone else stole the list in between.
//!
//! ## Sticky lists
//!
//! Sticky lists are per-worker caches. Their header is written without a
//! token check and expires on its own after the configured sticky TTL.
//!
//! ## Sweeps
//!
//! `complete_tasks_less_than` is a range delete with no way to count what
//! it removed, so it reports [`RowsAffected::Unknown`].

use crate::codec::{decode_task, decode_task_list, task_list_assignments, to_doc};
use crate::config::PersistenceConfig;
use crate::errors::{read_error, write_error};
use chrono::{Duration, Utc};
use fencepost_concurrency::{render_columns, Fence};
use fencepost_core::records::{TaskInfo, TaskListInfo, TaskListKind, TaskListType};
use fencepost_core::schema::{columns, TASKS_TABLE};
use fencepost_core::{
    DomainId, KeyPart, PartitionKey, PersistenceError, Result, Row, SchemaConstants,
};
use fencepost_storage::{Assignment, Batch, KeyRange, RangeQuery, Statement, WideColumnStore};
use std::ops::Bound;
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// Requests
// ============================================================================

/// Identity of a task list partition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskListKey {
    /// Domain
    pub domain_id: DomainId,
    /// List name; must not be empty
    pub name: String,
    /// What the list dispatches
    pub task_type: TaskListType,
}

impl TaskListKey {
    /// Key of a list
    pub fn new(domain_id: DomainId, name: impl Into<String>, task_type: TaskListType) -> Self {
        Self {
            domain_id,
            name: name.into(),
            task_type,
        }
    }

    fn validate(&self, operation: &str) -> Result<()> {
        if self.name.is_empty() {
            return Err(PersistenceError::internal(format!(
                "{}: task list name must not be empty",
                operation
            )));
        }
        Ok(())
    }
}

impl From<&TaskListInfo> for TaskListKey {
    fn from(info: &TaskListInfo) -> Self {
        Self::new(info.domain_id, info.name.clone(), info.task_type)
    }
}

/// Take or renew the lease of a task list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseTaskListRequest {
    /// List to lease
    pub key: TaskListKey,
    /// Token the caller holds when renewing; zero to steal unconditionally
    pub range_id: i64,
    /// Kind recorded when the list is created
    pub kind: TaskListKind,
}

/// Tasks to enqueue under a held lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTasksRequest {
    /// Header as last leased; its `range_id` is the fence
    pub task_list: TaskListInfo,
    /// Tasks with their ids already assigned
    pub tasks: Vec<TaskInfo>,
}

/// Read tasks with `read_level < task_id <= max_read_level`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetTasksRequest {
    /// List to read
    pub key: TaskListKey,
    /// Exclusive lower bound
    pub read_level: i64,
    /// Inclusive upper bound
    pub max_read_level: i64,
    /// Maximum tasks returned; zero uses the configured default
    pub batch_size: usize,
}

/// Row count reported by a range delete
///
/// The backing store does not report how many rows a range delete removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RowsAffected {
    /// The backend cannot tell how many rows were removed
    Unknown,
}

// ============================================================================
// TaskListStore
// ============================================================================

/// Leases, headers and tasks of worker task lists
pub struct TaskListStore {
    backend: Arc<dyn WideColumnStore>,
    schema: Arc<SchemaConstants>,
    config: Arc<PersistenceConfig>,
}

impl TaskListStore {
    /// Create a store over `backend`
    pub fn new(
        backend: Arc<dyn WideColumnStore>,
        schema: Arc<SchemaConstants>,
        config: Arc<PersistenceConfig>,
    ) -> Self {
        Self {
            backend,
            schema,
            config,
        }
    }

    fn partition(&self, key: &TaskListKey) -> PartitionKey {
        self.schema
            .task_list_partition(key.domain_id, &key.name, key.task_type.as_i64())
    }

    fn fence(&self, key: &TaskListKey, range_id: i64) -> Fence {
        Fence::task_list(
            &self.schema,
            key.domain_id,
            &key.name,
            key.task_type.as_i64(),
            range_id,
        )
    }

    /// Header columns other than the token, which the fence writes
    fn header_doc(info: &TaskListInfo) -> Result<Vec<Assignment>> {
        Ok(task_list_assignments(info)?
            .into_iter()
            .filter(|a| a.column() != columns::RANGE_ID)
            .collect())
    }

    fn lease_lost(
        operation: &str,
        key: &TaskListKey,
        fence: &Fence,
        rows: &[Row],
    ) -> PersistenceError {
        let observed = fence.find_break(rows).and_then(|b| b.observed);
        warn!(
            operation,
            task_list = %key.name,
            expected = fence.expected(),
            ?observed,
            "task list lease lost"
        );
        PersistenceError::condition_failed(format!(
            "{} on task list {}: range id {} no longer held, stored {:?}, columns {}",
            operation,
            key.name,
            fence.expected(),
            observed,
            render_columns(rows)
        ))
    }

    /// Take the lease of a list, creating the list if needed
    ///
    /// # Returns
    ///
    /// The header with the new token. The stored ack level and kind are
    /// kept for an existing list.
    ///
    /// # Errors
    ///
    /// `ConditionFailed` when `request.range_id` is set and differs from
    /// the stored token, or when another caller moved the token first.
    pub fn lease_task_list(&self, request: &LeaseTaskListRequest) -> Result<TaskListInfo> {
        let key = &request.key;
        key.validate("LeaseTaskList")?;
        let partition = self.partition(key);
        let existing = self
            .backend
            .read(TASKS_TABLE, &partition, &self.schema.task_list_row_key())
            .map_err(|e| read_error("LeaseTaskList", e))?;

        let Some(row) = existing else {
            let info = TaskListInfo {
                domain_id: key.domain_id,
                name: key.name.clone(),
                task_type: key.task_type,
                range_id: self.schema.initial_range_id,
                ack_level: 0,
                kind: request.kind,
                last_updated: Utc::now(),
            };
            let statement = Statement::insert(TASKS_TABLE, partition, self.schema.task_list_row_key())
                .assign_all(task_list_assignments(&info)?)
                .if_not_exists();
            let outcome = self
                .backend
                .execute(statement)
                .map_err(|e| write_error("LeaseTaskList", e))?;
            if !outcome.applied {
                return Err(PersistenceError::condition_failed(format!(
                    "LeaseTaskList: task list {} was created concurrently, columns {}",
                    key.name,
                    render_columns(&outcome.rows)
                )));
            }
            debug!(task_list = %key.name, range_id = info.range_id, "task list created");
            return Ok(info);
        };

        let stored = decode_task_list(&row)?;
        if request.range_id > 0 && request.range_id != stored.range_id {
            return Err(PersistenceError::condition_failed(format!(
                "LeaseTaskList: renew of task list {} failed, held range id {}, stored {}",
                key.name, request.range_id, stored.range_id
            )));
        }

        let info = TaskListInfo {
            range_id: stored.range_id + 1,
            last_updated: Utc::now(),
            ..stored
        };
        let fence = self.fence(key, info.range_id - 1);
        let statement = fence
            .advance_to(info.range_id)
            .assign_all(Self::header_doc(&info)?);
        let outcome = self
            .backend
            .execute(statement)
            .map_err(|e| write_error("LeaseTaskList", e))?;
        if !outcome.applied {
            return Err(Self::lease_lost("LeaseTaskList", key, &fence, &outcome.rows));
        }
        debug!(task_list = %key.name, range_id = info.range_id, "task list leased");
        Ok(info)
    }

    /// Write the header of a list
    ///
    /// Sticky lists are written unconditionally with the sticky TTL. All
    /// others are fenced on `info.range_id`.
    pub fn update_task_list(&self, info: &TaskListInfo) -> Result<()> {
        let key = TaskListKey::from(info);
        key.validate("UpdateTaskList")?;

        if info.kind == TaskListKind::Sticky {
            let statement = Statement::insert(
                TASKS_TABLE,
                self.partition(&key),
                self.schema.task_list_row_key(),
            )
            .assign_all(task_list_assignments(info)?)
            .with_ttl(self.config.sticky_task_list_ttl_secs);
            self.backend
                .execute(statement)
                .map_err(|e| write_error("UpdateTaskList", e))?;
            return Ok(());
        }

        let fence = self.fence(&key, info.range_id);
        let statement = fence.statement().assign_all(Self::header_doc(info)?);
        let outcome = self
            .backend
            .execute(statement)
            .map_err(|e| write_error("UpdateTaskList", e))?;
        if !outcome.applied {
            return Err(Self::lease_lost("UpdateTaskList", &key, &fence, &outcome.rows));
        }
        Ok(())
    }

    /// Delete the header of a list if the caller still holds `range_id`
    pub fn delete_task_list(&self, key: &TaskListKey, range_id: i64) -> Result<()> {
        key.validate("DeleteTaskList")?;
        let fence = self.fence(key, range_id);
        let statement = Statement::delete(
            TASKS_TABLE,
            self.partition(key),
            self.schema.task_list_row_key(),
        )
        .if_eq(columns::RANGE_ID, range_id);
        let outcome = self
            .backend
            .execute(statement)
            .map_err(|e| write_error("DeleteTaskList", e))?;
        if !outcome.applied {
            return Err(Self::lease_lost("DeleteTaskList", key, &fence, &outcome.rows));
        }
        Ok(())
    }

    /// Enqueue tasks under the lease recorded in `request.task_list`
    ///
    /// Tasks with a schedule-to-start timeout expire after it, capped at
    /// the configured maximum TTL.
    ///
    /// # Errors
    ///
    /// `ConditionFailed` if the lease moved; no task is written.
    pub fn create_tasks(&self, request: &CreateTasksRequest) -> Result<()> {
        let key = TaskListKey::from(&request.task_list);
        key.validate("CreateTasks")?;
        let partition = self.partition(&key);

        let mut batch = Batch::new();
        for task in &request.tasks {
            let ttl = i64::from(task.schedule_to_start_timeout_secs).min(self.config.max_task_ttl_secs);
            let mut stored = task.clone();
            if ttl > 0 {
                stored.expiry = Some(task.created_time + Duration::seconds(ttl));
            }
            let mut statement = Statement::insert(
                TASKS_TABLE,
                partition.clone(),
                self.schema.task_row_key(task.task_id),
            )
            .set(columns::TASK, to_doc(&stored)?);
            if ttl > 0 {
                statement = statement.with_ttl(ttl);
            }
            batch.push(statement);
        }
        let fence = self.fence(&key, request.task_list.range_id);
        batch.push(fence.statement());

        debug!(
            task_list = %key.name,
            tasks = request.tasks.len(),
            range_id = fence.expected(),
            "creating tasks"
        );
        let outcome = self
            .backend
            .batch(batch)
            .map_err(|e| write_error("CreateTasks", e))?;
        if !outcome.applied {
            return Err(Self::lease_lost("CreateTasks", &key, &fence, &outcome.rows));
        }
        Ok(())
    }

    /// Read tasks in task id order, at most `batch_size` of them
    pub fn get_tasks(&self, request: &GetTasksRequest) -> Result<Vec<TaskInfo>> {
        request.key.validate("GetTasks")?;
        if request.read_level >= request.max_read_level {
            return Ok(Vec::new());
        }
        let query = RangeQuery {
            range: KeyRange {
                table: TASKS_TABLE,
                partition: self.partition(&request.key),
                prefix: self.schema.task_row_prefix(),
                lower: Bound::Excluded(KeyPart::Int(request.read_level)),
                upper: Bound::Included(KeyPart::Int(request.max_read_level)),
            },
            page_size: self.config.page_size(request.batch_size),
            page_token: None,
        };
        let page = self
            .backend
            .scan(&query)
            .map_err(|e| read_error("GetTasks", e))?;
        page.rows.iter().map(decode_task).collect()
    }

    /// Delete one task; an absent task is not an error
    pub fn complete_task(&self, key: &TaskListKey, task_id: i64) -> Result<()> {
        key.validate("CompleteTask")?;
        let statement = Statement::delete(
            TASKS_TABLE,
            self.partition(key),
            self.schema.task_row_key(task_id),
        );
        self.backend
            .execute(statement)
            .map_err(|e| write_error("CompleteTask", e))?;
        Ok(())
    }

    /// Delete every task with `task_id <= task_id`
    pub fn complete_tasks_less_than(&self, key: &TaskListKey, task_id: i64) -> Result<RowsAffected> {
        key.validate("CompleteTasksLessThan")?;
        let range = KeyRange {
            table: TASKS_TABLE,
            partition: self.partition(key),
            prefix: self.schema.task_row_prefix(),
            lower: Bound::Unbounded,
            upper: Bound::Included(KeyPart::Int(task_id)),
        };
        self.backend
            .delete_range(&range)
            .map_err(|e| write_error("CompleteTasksLessThan", e))?;
        Ok(RowsAffected::Unknown)
    }
}

impl std::fmt::Debug for TaskListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskListStore")
            .field("sticky_ttl_secs", &self.config.sticky_task_list_ttl_secs)
            .field("max_task_ttl_secs", &self.config.max_task_ttl_secs)
            .finish()
    }
}
