//! Create path

use super::{validate_create_state, CreateWorkflowExecutionRequest, CreateWorkflowMode};
use super::{ExecutionStore, WorkflowSnapshot};
use crate::codec::{current_assignments, snapshot_assignments};
use fencepost_concurrency::{classify_create, CreateExpectations};
use fencepost_core::records::{CloseStatus, ReplicationMode, WorkflowState};
use fencepost_core::schema::{columns, EXECUTIONS_TABLE};
use fencepost_core::{Cell, PersistenceError, Result};
use fencepost_storage::{Batch, Statement};
use tracing::debug;

/// The mode actually enforced for `requested`
///
/// A run without replication state carries no last write version, so id
/// reuse can only check which run is current.
fn effective_mode(requested: CreateWorkflowMode, replication: &ReplicationMode) -> CreateWorkflowMode {
    match requested {
        CreateWorkflowMode::WorkflowIdReuse {
            previous_run_id, ..
        } if replication.replication_state().is_none() => {
            CreateWorkflowMode::ContinueAsNew { previous_run_id }
        }
        other => other,
    }
}

impl ExecutionStore {
    /// Create a run
    ///
    /// Writes the run, its queue entries and (except for zombies) the
    /// current pointer in one batch fenced by the shard token.
    ///
    /// # Errors
    ///
    /// - `ShardOwnershipLost` if the shard token moved
    /// - `WorkflowExecutionAlreadyStarted` if a pointer blocks a brand-new
    ///   run, or names the previous run but it failed the reuse guard
    /// - `CurrentWorkflowConditionFailed` if the pointer names another run
    /// - `ConditionFailed` for anything else
    /// - `Internal` if the state is invalid, or a zombie is current
    pub fn create_workflow_execution(&self, request: &CreateWorkflowExecutionRequest) -> Result<()> {
        let state = &request.new_workflow.state;
        let info = &state.execution_info;
        validate_create_state(info)?;

        let mode = effective_mode(request.mode, &state.replication);
        if mode == CreateWorkflowMode::Zombie {
            if info.state != WorkflowState::Zombie || info.close_status != CloseStatus::None {
                return Err(PersistenceError::internal(format!(
                    "zombie create of run {} requires state Zombie without close status, got {:?}/{:?}",
                    info.run_id, info.state, info.close_status
                )));
            }
            self.assert_not_current(info)?;
        }

        let fence = self.fence(request.range_id);
        let mut batch = Batch::new();
        batch.extend(self.create_statements(&request.new_workflow, mode)?);
        batch.push(fence.statement());

        let outcome = self.submit("CreateWorkflowExecution", batch)?;
        if outcome.applied {
            debug!(
                shard_id = self.shard_id,
                workflow_id = %info.workflow_id,
                run_id = %info.run_id,
                ?mode,
                "run created"
            );
            return Ok(());
        }

        let expectations = CreateExpectations {
            shard: fence,
            previous_run_id: mode.previous_run_id(),
        };
        let conflict = classify_create(&self.schema, &outcome.rows, &expectations);
        Err(self.conflict_error("CreateWorkflowExecution", conflict))
    }

    /// Pointer statement, run insert and queue entries of a new run
    pub(super) fn create_statements(
        &self,
        snapshot: &WorkflowSnapshot,
        mode: CreateWorkflowMode,
    ) -> Result<Vec<Statement>> {
        let state = &snapshot.state;
        let info = &state.execution_info;
        let current_key = self.current_key(info.domain_id, &info.workflow_id);
        let pointer = current_assignments(info, &state.replication)?;

        let mut out = Vec::with_capacity(snapshot.tasks.len() + 2);
        match mode {
            CreateWorkflowMode::BrandNew => out.push(
                Statement::insert(EXECUTIONS_TABLE, self.partition(), current_key)
                    .assign_all(pointer)
                    .if_not_exists(),
            ),
            CreateWorkflowMode::ContinueAsNew { previous_run_id } => out.push(
                Statement::update(EXECUTIONS_TABLE, self.partition(), current_key)
                    .assign_all(pointer)
                    .if_eq(columns::CURRENT_RUN_ID, Cell::Uuid(previous_run_id.as_uuid()))
                    .with_ttl(0),
            ),
            CreateWorkflowMode::WorkflowIdReuse {
                previous_run_id,
                previous_last_write_version,
            } => out.push(
                Statement::update(EXECUTIONS_TABLE, self.partition(), current_key)
                    .assign_all(pointer)
                    .if_eq(columns::CURRENT_RUN_ID, Cell::Uuid(previous_run_id.as_uuid()))
                    .if_eq(columns::WORKFLOW_LAST_WRITE_VERSION, previous_last_write_version)
                    .if_eq(columns::WORKFLOW_STATE, WorkflowState::Completed.as_i64())
                    .with_ttl(0),
            ),
            CreateWorkflowMode::Zombie => {}
        }

        out.push(
            Statement::insert(
                EXECUTIONS_TABLE,
                self.partition(),
                self.run_key(info.domain_id, &info.workflow_id, info.run_id),
            )
            .assign_all(snapshot_assignments(&self.schema, state)?),
        );
        out.extend(self.task_statements(&snapshot.tasks)?);
        Ok(out)
    }
}
