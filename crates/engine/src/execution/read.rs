//! Reads and deletes

use super::ExecutionStore;
use crate::codec::{decode_current, decode_mutable_state};
use crate::errors::{read_error, write_error};
use fencepost_core::records::{CurrentExecution, WorkflowExecutionInfo, WorkflowMutableState};
use fencepost_core::schema::{columns, EXECUTIONS_TABLE};
use fencepost_core::{Cell, DomainId, PersistenceError, Result, WorkflowExecution};
use fencepost_storage::Statement;
use tracing::debug;

impl ExecutionStore {
    /// Read the full state of a run
    pub fn get_workflow_execution(
        &self,
        domain_id: DomainId,
        execution: &WorkflowExecution,
    ) -> Result<WorkflowMutableState> {
        let row = self
            .backend
            .read(
                EXECUTIONS_TABLE,
                &self.partition(),
                &self.run_key(domain_id, &execution.workflow_id, execution.run_id),
            )
            .map_err(|e| read_error("GetWorkflowExecution", e))?
            .ok_or_else(|| {
                PersistenceError::not_found(format!("workflow execution {} not found", execution))
            })?;
        decode_mutable_state(&self.schema, &row)
    }

    /// Read the current pointer of a workflow id
    pub fn get_current_execution(
        &self,
        domain_id: DomainId,
        workflow_id: &str,
    ) -> Result<CurrentExecution> {
        self.read_current(domain_id, workflow_id)?.ok_or_else(|| {
            PersistenceError::not_found(format!("current execution of {} not found", workflow_id))
        })
    }

    fn read_current(&self, domain_id: DomainId, workflow_id: &str) -> Result<Option<CurrentExecution>> {
        self.backend
            .read(
                EXECUTIONS_TABLE,
                &self.partition(),
                &self.current_key(domain_id, workflow_id),
            )
            .map_err(|e| read_error("GetCurrentExecution", e))?
            .map(|row| decode_current(&row))
            .transpose()
    }

    /// Fail with `Internal` if the pointer names `info`'s run
    pub(super) fn assert_not_current(&self, info: &WorkflowExecutionInfo) -> Result<()> {
        match self.read_current(info.domain_id, &info.workflow_id)? {
            Some(current) if current.run_id == info.run_id => {
                Err(PersistenceError::internal(format!(
                    "run {} of {} is current but must not be",
                    info.run_id, info.workflow_id
                )))
            }
            _ => Ok(()),
        }
    }

    /// Delete a run row; deleting an absent run succeeds
    pub fn delete_workflow_execution(
        &self,
        domain_id: DomainId,
        execution: &WorkflowExecution,
    ) -> Result<()> {
        let statement = Statement::delete(
            EXECUTIONS_TABLE,
            self.partition(),
            self.run_key(domain_id, &execution.workflow_id, execution.run_id),
        );
        self.backend
            .execute(statement)
            .map_err(|e| write_error("DeleteWorkflowExecution", e))?;
        Ok(())
    }

    /// Delete the current pointer if it still names `execution`'s run
    ///
    /// A pointer that names another run is left in place and the call
    /// still succeeds.
    pub fn delete_current_workflow_execution(
        &self,
        domain_id: DomainId,
        execution: &WorkflowExecution,
    ) -> Result<()> {
        let statement = Statement::delete(
            EXECUTIONS_TABLE,
            self.partition(),
            self.current_key(domain_id, &execution.workflow_id),
        )
        .if_eq(columns::CURRENT_RUN_ID, Cell::Uuid(execution.run_id.as_uuid()));
        let outcome = self
            .backend
            .execute(statement)
            .map_err(|e| write_error("DeleteCurrentWorkflowExecution", e))?;
        if !outcome.applied {
            debug!(
                shard_id = self.shard_id,
                %execution,
                "current pointer names another run, left in place"
            );
        }
        Ok(())
    }
}
