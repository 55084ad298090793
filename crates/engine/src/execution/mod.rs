//! Execution store
//!
//! Runs, their current pointers and the queue entries derived from them all
//! live in the partition of the shard that owns the workflow id. Every write
//! is one atomic batch against that partition, and every batch ends with the
//! shard fence so that nothing is written under a lost lease.
//!
//! # Design
//!
//! ## Batch shapes
//!
//! | Operation | Current pointer | Run row | Extra |
//! |-----------|-----------------|---------|-------|
//! | create, brand new | insert `IF NOT EXISTS` | insert | tasks |
//! | create, continue / reuse | update `IF current_run_id = prev ...` | insert | tasks |
//! | create, zombie | untouched, asserted not current | insert | tasks |
//! | update | update `IF current_run_id = run` | update `IF next_event_id = c` | tasks, successor run |
//! | reset | update `IF current_run_id = curr` | insert new run | base run assert, current run mutate or assert |
//! | reset mutable state | update `IF current_run_id, version, state` | replace `IF next_event_id = c` | tasks |
//!
//! ## Rejections
//!
//! A rejected batch is handed to the classifier together with what the
//! batch conditioned on; the resulting conflict is mapped to a
//! [`PersistenceError`] by [`ExecutionStore::conflict_error`].

mod create;
mod read;
mod requests;
mod reset;
mod update;

pub use requests::{
    CreateWorkflowExecutionRequest, CreateWorkflowMode, CurrentRunAction, CurrentRunGuard,
    ResetMutableStateRequest, ResetWorkflowExecutionRequest, UpdateWorkflowExecutionRequest,
    WorkflowMutation, WorkflowSnapshot,
};

use crate::codec::{decode_current, to_doc};
use crate::errors::write_error;
use fencepost_concurrency::{Conflict, Fence};
use fencepost_core::records::{
    CloseStatus, Tasks, WorkflowExecutionInfo, WorkflowState,
};
use fencepost_core::schema::{columns, EXECUTIONS_TABLE};
use fencepost_core::{
    ClusteringKey, DomainId, PartitionKey, PersistenceError, Result, RunId, SchemaConstants,
};
use fencepost_storage::{Batch, CasOutcome, Statement, WideColumnStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs and current pointers of one shard
pub struct ExecutionStore {
    shard_id: i32,
    backend: Arc<dyn WideColumnStore>,
    schema: Arc<SchemaConstants>,
}

impl ExecutionStore {
    /// Create a store for `shard_id`
    pub fn new(
        shard_id: i32,
        backend: Arc<dyn WideColumnStore>,
        schema: Arc<SchemaConstants>,
    ) -> Self {
        Self {
            shard_id,
            backend,
            schema,
        }
    }

    /// Shard this store writes to
    pub fn shard_id(&self) -> i32 {
        self.shard_id
    }

    // ========================================================================
    // Keys and statements
    // ========================================================================

    fn partition(&self) -> PartitionKey {
        self.schema.shard_partition(self.shard_id)
    }

    fn fence(&self, range_id: i64) -> Fence {
        Fence::shard(&self.schema, self.shard_id, range_id)
    }

    fn run_key(&self, domain_id: DomainId, workflow_id: &str, run_id: RunId) -> ClusteringKey {
        self.schema.execution_row_key(domain_id, workflow_id, run_id)
    }

    fn current_key(&self, domain_id: DomainId, workflow_id: &str) -> ClusteringKey {
        self.schema.current_row_key(domain_id, workflow_id)
    }

    /// `SET next_event_id = c IF next_event_id = c` on a run row
    fn assert_next_event_id(
        &self,
        domain_id: DomainId,
        workflow_id: &str,
        run_id: RunId,
        condition: i64,
    ) -> Statement {
        Statement::update(
            EXECUTIONS_TABLE,
            self.partition(),
            self.run_key(domain_id, workflow_id, run_id),
        )
        .set(columns::NEXT_EVENT_ID, condition)
        .if_eq(columns::NEXT_EVENT_ID, condition)
    }

    /// Inserts of the queue entries of a mutation
    fn task_statements(&self, tasks: &Tasks) -> Result<Vec<Statement>> {
        let mut out = Vec::with_capacity(tasks.len());
        for task in &tasks.transfer {
            out.push(
                Statement::insert(
                    EXECUTIONS_TABLE,
                    self.partition(),
                    self.schema.transfer_task_key(task.task_id),
                )
                .set(columns::TRANSFER, to_doc(task)?),
            );
        }
        for task in &tasks.timer {
            out.push(
                Statement::insert(
                    EXECUTIONS_TABLE,
                    self.partition(),
                    self.schema
                        .timer_task_key(task.visibility_timestamp.timestamp_millis(), task.task_id),
                )
                .set(columns::TIMER, to_doc(task)?),
            );
        }
        for task in &tasks.replication {
            out.push(
                Statement::insert(
                    EXECUTIONS_TABLE,
                    self.partition(),
                    self.schema.replication_task_key(task.task_id),
                )
                .set(columns::REPLICATION, to_doc(task)?),
            );
        }
        Ok(out)
    }

    fn submit(&self, operation: &'static str, batch: Batch) -> Result<CasOutcome> {
        debug!(
            shard_id = self.shard_id,
            operation,
            statements = batch.len(),
            "issuing batch"
        );
        self.backend
            .batch(batch)
            .map_err(|e| write_error(operation, e))
    }

    /// Map a classified rejection to the error returned to the caller
    fn conflict_error(&self, operation: &str, conflict: Conflict<'_>) -> PersistenceError {
        match conflict {
            Conflict::ShardOwnershipLost(broken) => {
                warn!(
                    shard_id = self.shard_id,
                    operation,
                    expected = broken.expected,
                    observed = ?broken.observed,
                    "shard lease lost"
                );
                PersistenceError::ShardOwnershipLost {
                    shard_id: self.shard_id,
                    message: format!(
                        "{} failed, request range id {}, stored range id {:?}",
                        operation, broken.expected, broken.observed
                    ),
                }
            }
            Conflict::AlreadyStarted { current_row } => match decode_current(current_row) {
                Ok(current) => PersistenceError::WorkflowExecutionAlreadyStarted {
                    run_id: current.run_id,
                    create_request_id: current.create_request_id,
                    state: current.state,
                    close_status: current.close_status,
                    last_write_version: current.last_write_version,
                },
                Err(e) => e,
            },
            Conflict::CurrentRunMismatch { expected, observed } => {
                PersistenceError::CurrentWorkflowConditionFailed(format!(
                    "{} failed, expected current run {}, found {:?}",
                    operation, expected, observed
                ))
            }
            Conflict::NextEventIdMismatch {
                run_id,
                expected,
                observed,
            } => PersistenceError::ConditionFailed(format!(
                "{} failed, run {} expected next event id {}, found {:?}",
                operation, run_id, expected, observed
            )),
            Conflict::Unexplained { columns } => PersistenceError::ConditionFailed(format!(
                "{} failed, columns: ({})",
                operation, columns
            )),
        }
    }
}

impl std::fmt::Debug for ExecutionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionStore")
            .field("shard_id", &self.shard_id)
            .finish()
    }
}

// ============================================================================
// Validation
// ============================================================================

/// A new run may be created in any open state
fn validate_create_state(info: &WorkflowExecutionInfo) -> Result<()> {
    match info.state {
        WorkflowState::Created | WorkflowState::Running | WorkflowState::Zombie => {
            if info.close_status != CloseStatus::None {
                return Err(PersistenceError::internal(format!(
                    "cannot create run {} in state {:?} with close status {:?}",
                    info.run_id, info.state, info.close_status
                )));
            }
            Ok(())
        }
        WorkflowState::Completed => Err(PersistenceError::internal(format!(
            "cannot create run {} in state Completed",
            info.run_id
        ))),
    }
}

/// Open states carry no close status; a completed run must carry one
fn validate_update_state(info: &WorkflowExecutionInfo) -> Result<()> {
    let consistent = match info.state {
        WorkflowState::Created | WorkflowState::Running | WorkflowState::Zombie => {
            info.close_status == CloseStatus::None
        }
        WorkflowState::Completed => info.close_status != CloseStatus::None,
    };
    if !consistent {
        return Err(PersistenceError::internal(format!(
            "run {} has state {:?} with close status {:?}",
            info.run_id, info.state, info.close_status
        )));
    }
    Ok(())
}

/// History never moves backwards past the lock value
fn validate_condition(info: &WorkflowExecutionInfo, condition: i64) -> Result<()> {
    if info.next_event_id < condition {
        return Err(PersistenceError::internal(format!(
            "run {} next event id {} is below condition {}",
            info.run_id, info.next_event_id, condition
        )));
    }
    Ok(())
}
