//! Reset paths
//!
//! Both resets repoint the current pointer in the same batch that writes the
//! run it should name. `reset_workflow_execution` forks a brand-new run;
//! `reset_mutable_state` rewrites an existing one in place.

use super::{
    validate_condition, validate_create_state, validate_update_state, CurrentRunAction,
    ExecutionStore, ResetMutableStateRequest, ResetWorkflowExecutionRequest,
};
use crate::codec::snapshot_assignments;
use fencepost_concurrency::{classify, Expectations};
use fencepost_core::schema::{columns, EXECUTIONS_TABLE};
use fencepost_core::{PersistenceError, Result};
use fencepost_storage::{Assignment, Batch, Statement};
use tracing::debug;

impl ExecutionStore {
    /// Fork a new run and make it current
    ///
    /// The batch contains:
    /// - the pointer moved from the current run to the new one, with the
    ///   version and state guard when given
    /// - an assert-unchanged check on the base run when it is not the
    ///   current run, so a concurrent truncation of its history is caught
    /// - the current run's mutation, or an assert-unchanged check on it
    /// - the new run's full state and queue entries
    /// - the shard fence
    ///
    /// # Errors
    ///
    /// As for updates: `ShardOwnershipLost`,
    /// `CurrentWorkflowConditionFailed`, `ConditionFailed`, `Internal`.
    pub fn reset_workflow_execution(&self, request: &ResetWorkflowExecutionRequest) -> Result<()> {
        let new_state = &request.new_workflow.state;
        let new_info = &new_state.execution_info;
        validate_create_state(new_info)?;
        if let CurrentRunAction::Update(mutation) = &request.current {
            let info = &mutation.execution_info;
            validate_update_state(info)?;
            validate_condition(info, mutation.condition)?;
            if info.domain_id != new_info.domain_id || info.workflow_id != new_info.workflow_id {
                return Err(PersistenceError::internal(format!(
                    "reset of {} mutates run {} of another workflow {}",
                    new_info.workflow_id, info.run_id, info.workflow_id
                )));
            }
        }
        let (current_run_id, current_condition) = request.current.run_and_condition();
        let (domain_id, workflow_id) = (new_info.domain_id, new_info.workflow_id.as_str());

        let fence = self.fence(request.range_id);
        let mut expectations = Expectations {
            shard: fence.clone(),
            current_run_id: Some(current_run_id),
            runs: vec![(current_run_id, current_condition)],
        };
        let mut batch = Batch::new();

        let mut pointer = self.pointer_update(new_info, &new_state.replication, current_run_id)?;
        if let Some(guard) = &request.current_run_guard {
            pointer = pointer
                .if_eq(columns::WORKFLOW_LAST_WRITE_VERSION, guard.last_write_version)
                .if_eq(columns::WORKFLOW_STATE, guard.state.as_i64());
        }
        batch.push(pointer);

        if request.base_run_id != current_run_id {
            batch.push(self.assert_next_event_id(
                domain_id,
                workflow_id,
                request.base_run_id,
                request.base_run_next_event_id,
            ));
            expectations
                .runs
                .push((request.base_run_id, request.base_run_next_event_id));
        }

        match &request.current {
            CurrentRunAction::Update(mutation) => {
                batch.push(self.mutation_statement(mutation)?);
                batch.extend(self.task_statements(&mutation.tasks)?);
            }
            CurrentRunAction::AssertUnchanged { run_id, condition } => {
                batch.push(self.assert_next_event_id(domain_id, workflow_id, *run_id, *condition));
            }
        }

        batch.push(
            Statement::insert(
                EXECUTIONS_TABLE,
                self.partition(),
                self.run_key(domain_id, workflow_id, new_info.run_id),
            )
            .assign_all(snapshot_assignments(&self.schema, new_state)?),
        );
        batch.extend(self.task_statements(&request.new_workflow.tasks)?);
        batch.push(fence.statement());

        let outcome = self.submit("ResetWorkflowExecution", batch)?;
        if outcome.applied {
            debug!(
                shard_id = self.shard_id,
                workflow_id,
                base_run_id = %request.base_run_id,
                new_run_id = %new_info.run_id,
                "run reset"
            );
            return Ok(());
        }
        let conflict = classify(&self.schema, &outcome.rows, &expectations);
        Err(self.conflict_error("ResetWorkflowExecution", conflict))
    }

    /// Replace a run's state wholesale and repoint the current pointer at it
    ///
    /// Every sub-collection is replaced by the snapshot's and buffered
    /// events are dropped. The pointer must still name
    /// `previous_run_id` at `previous_last_write_version` and
    /// `previous_state`.
    pub fn reset_mutable_state(&self, request: &ResetMutableStateRequest) -> Result<()> {
        let snapshot = &request.snapshot;
        let info = &snapshot.state.execution_info;
        validate_update_state(info)?;
        validate_condition(info, snapshot.condition)?;

        let fence = self.fence(request.range_id);
        let expectations = Expectations {
            shard: fence.clone(),
            current_run_id: Some(request.previous_run_id),
            runs: vec![(info.run_id, snapshot.condition)],
        };

        let pointer = self
            .pointer_update(info, &snapshot.state.replication, request.previous_run_id)?
            .if_eq(
                columns::WORKFLOW_LAST_WRITE_VERSION,
                request.previous_last_write_version,
            )
            .if_eq(columns::WORKFLOW_STATE, request.previous_state.as_i64());

        let columns_of_run = snapshot_assignments(&self.schema, &snapshot.state)?
            .into_iter()
            .filter(|a| a.column() != columns::BUFFERED_EVENTS_LIST);
        let run = Statement::update(
            EXECUTIONS_TABLE,
            self.partition(),
            self.run_key(info.domain_id, &info.workflow_id, info.run_id),
        )
        .assign_all(columns_of_run)
        .assign(Assignment::Remove(columns::BUFFERED_EVENTS_LIST))
        .if_eq(columns::NEXT_EVENT_ID, snapshot.condition);

        let mut batch = Batch::new();
        batch.push(pointer);
        batch.push(run);
        batch.extend(self.task_statements(&snapshot.tasks)?);
        batch.push(fence.statement());

        let outcome = self.submit("ResetMutableState", batch)?;
        if outcome.applied {
            debug!(
                shard_id = self.shard_id,
                workflow_id = %info.workflow_id,
                run_id = %info.run_id,
                "mutable state reset"
            );
            return Ok(());
        }
        let conflict = classify(&self.schema, &outcome.rows, &expectations);
        Err(self.conflict_error("ResetMutableState", conflict))
    }
}
