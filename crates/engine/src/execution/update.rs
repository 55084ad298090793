//! Update path

use super::{
    validate_condition, validate_create_state, validate_update_state, CreateWorkflowMode,
    ExecutionStore, UpdateWorkflowExecutionRequest, WorkflowMutation,
};
use crate::codec::{buffered_event, current_assignments, entry, request_ids, scalar_assignments};
use fencepost_concurrency::{classify, Expectations};
use fencepost_core::records::{ReplicationMode, WorkflowExecutionInfo, WorkflowState};
use fencepost_core::schema::{columns, EXECUTIONS_TABLE};
use fencepost_core::{Cell, KeyPart, Result, RunId};
use fencepost_storage::{Assignment, Batch, Statement};
use tracing::debug;

impl ExecutionStore {
    /// Apply a mutation to a run
    ///
    /// The run row is gated on `next_event_id == mutation.condition`. With a
    /// successor run the successor is created in the same batch and takes
    /// over the current pointer; otherwise the pointer is refreshed, except
    /// for zombie runs which are asserted not current instead.
    ///
    /// # Errors
    ///
    /// - `ShardOwnershipLost` if the shard token moved
    /// - `CurrentWorkflowConditionFailed` if the run is no longer current
    /// - `ConditionFailed` if the run's `next_event_id` moved
    /// - `Internal` for an invalid state
    pub fn update_workflow_execution(&self, request: &UpdateWorkflowExecutionRequest) -> Result<()> {
        let mutation = &request.mutation;
        let info = &mutation.execution_info;
        validate_update_state(info)?;
        validate_condition(info, mutation.condition)?;
        if let Some(successor) = &request.new_workflow {
            validate_create_state(&successor.state.execution_info)?;
        }

        let fence = self.fence(request.range_id);
        let mut expectations = Expectations {
            shard: fence.clone(),
            current_run_id: None,
            runs: vec![(info.run_id, mutation.condition)],
        };
        let mut batch = Batch::new();
        batch.push(self.mutation_statement(mutation)?);
        batch.extend(self.task_statements(&mutation.tasks)?);

        match &request.new_workflow {
            Some(successor) => {
                let mode = CreateWorkflowMode::ContinueAsNew {
                    previous_run_id: info.run_id,
                };
                batch.extend(self.create_statements(successor, mode)?);
                expectations.current_run_id = Some(info.run_id);
            }
            None if info.state == WorkflowState::Zombie => self.assert_not_current(info)?,
            None => {
                batch.push(self.pointer_update(info, &mutation.replication, info.run_id)?);
                expectations.current_run_id = Some(info.run_id);
            }
        }
        batch.push(fence.statement());

        let outcome = self.submit("UpdateWorkflowExecution", batch)?;
        if outcome.applied {
            debug!(
                shard_id = self.shard_id,
                workflow_id = %info.workflow_id,
                run_id = %info.run_id,
                next_event_id = info.next_event_id,
                "run updated"
            );
            return Ok(());
        }
        let conflict = classify(&self.schema, &outcome.rows, &expectations);
        Err(self.conflict_error("UpdateWorkflowExecution", conflict))
    }

    /// Refresh the current pointer from `info`, requiring it to name
    /// `expected_run_id`
    pub(super) fn pointer_update(
        &self,
        info: &WorkflowExecutionInfo,
        replication: &ReplicationMode,
        expected_run_id: RunId,
    ) -> Result<Statement> {
        Ok(Statement::update(
            EXECUTIONS_TABLE,
            self.partition(),
            self.current_key(info.domain_id, &info.workflow_id),
        )
        .assign_all(current_assignments(info, replication)?)
        .if_eq(columns::CURRENT_RUN_ID, Cell::Uuid(expected_run_id.as_uuid()))
        .with_ttl(0))
    }

    /// Run-row update carrying the scalar state and every per-key change,
    /// gated on the mutation's condition
    pub(super) fn mutation_statement(&self, mutation: &WorkflowMutation) -> Result<Statement> {
        let info = &mutation.execution_info;
        let mut assignments = scalar_assignments(&self.schema, info, &mutation.replication)?;

        for activity in &mutation.upsert_activity_infos {
            assignments.push(entry(columns::ACTIVITY_MAP, activity.schedule_id, activity)?);
        }
        for id in &mutation.delete_activity_infos {
            assignments.push(Assignment::RemoveMapEntry(columns::ACTIVITY_MAP, KeyPart::Int(*id)));
        }
        for timer in &mutation.upsert_timer_infos {
            assignments.push(entry(columns::TIMER_MAP, timer.timer_id.clone(), timer)?);
        }
        for id in &mutation.delete_timer_infos {
            assignments.push(Assignment::RemoveMapEntry(
                columns::TIMER_MAP,
                KeyPart::Text(id.clone()),
            ));
        }
        for child in &mutation.upsert_child_execution_infos {
            assignments.push(entry(columns::CHILD_EXECUTIONS_MAP, child.initiated_id, child)?);
        }
        for id in &mutation.delete_child_execution_infos {
            assignments.push(Assignment::RemoveMapEntry(
                columns::CHILD_EXECUTIONS_MAP,
                KeyPart::Int(*id),
            ));
        }
        for cancel in &mutation.upsert_request_cancel_infos {
            assignments.push(entry(columns::REQUEST_CANCEL_MAP, cancel.initiated_id, cancel)?);
        }
        for id in &mutation.delete_request_cancel_infos {
            assignments.push(Assignment::RemoveMapEntry(
                columns::REQUEST_CANCEL_MAP,
                KeyPart::Int(*id),
            ));
        }
        for signal in &mutation.upsert_signal_infos {
            assignments.push(entry(columns::SIGNAL_MAP, signal.initiated_id, signal)?);
        }
        for id in &mutation.delete_signal_infos {
            assignments.push(Assignment::RemoveMapEntry(columns::SIGNAL_MAP, KeyPart::Int(*id)));
        }
        if !mutation.upsert_signal_requested_ids.is_empty() {
            assignments.push(Assignment::AddToSet(
                columns::SIGNAL_REQUESTED,
                request_ids(&mutation.upsert_signal_requested_ids),
            ));
        }
        if !mutation.delete_signal_requested_ids.is_empty() {
            assignments.push(Assignment::RemoveFromSet(
                columns::SIGNAL_REQUESTED,
                request_ids(&mutation.delete_signal_requested_ids),
            ));
        }
        if mutation.clear_buffered_events {
            assignments.push(Assignment::Remove(columns::BUFFERED_EVENTS_LIST));
        }
        if let Some(events) = &mutation.new_buffered_events {
            assignments.push(Assignment::AppendList(
                columns::BUFFERED_EVENTS_LIST,
                vec![buffered_event(events)?],
            ));
        }

        Ok(Statement::update(
            EXECUTIONS_TABLE,
            self.partition(),
            self.run_key(info.domain_id, &info.workflow_id, info.run_id),
        )
        .assign_all(assignments)
        .if_eq(columns::NEXT_EVENT_ID, mutation.condition))
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{Fixture, RANGE};
    use super::super::WorkflowSnapshot;
    use super::*;
    use chrono::Utc;
    use fencepost_core::records::{
        CloseStatus, ReplicationState, SignalInfo, TimerInfo, WorkflowMutableState,
    };
    use fencepost_core::{DataBlob, EncodingType, PersistenceError, WorkflowExecution, EMPTY_VERSION};
    use fencepost_storage::Fault;
    use std::collections::BTreeMap;

    fn mutation(fx: &Fixture, run_id: RunId, condition: i64, next: i64) -> WorkflowMutation {
        let mut info = fx.info("wf", run_id);
        info.state = WorkflowState::Running;
        info.next_event_id = next;
        WorkflowMutation::new(info, ReplicationMode::Legacy, condition)
    }

    fn update(fx: &Fixture, mutation: WorkflowMutation) -> Result<()> {
        fx.store.update_workflow_execution(&UpdateWorkflowExecutionRequest {
            range_id: RANGE,
            mutation,
            new_workflow: None,
        })
    }

    fn read(fx: &Fixture, run_id: RunId) -> WorkflowMutableState {
        fx.store
            .get_workflow_execution(fx.domain_id, &WorkflowExecution::new("wf", run_id))
            .unwrap()
    }

    #[test]
    fn test_update_advances_next_event_id() {
        let fx = Fixture::new();
        let run_id = RunId::new();
        fx.create("wf", run_id, CreateWorkflowMode::BrandNew).unwrap();
        update(&fx, mutation(&fx, run_id, 3, 7)).unwrap();
        let state = read(&fx, run_id);
        assert_eq!(state.execution_info.next_event_id, 7);
        assert_eq!(state.execution_info.state, WorkflowState::Running);
        let current = fx.store.get_current_execution(fx.domain_id, "wf").unwrap();
        assert_eq!(current.state, WorkflowState::Running);
    }

    #[test]
    fn test_replayed_update_is_condition_failed() {
        let fx = Fixture::new();
        let run_id = RunId::new();
        fx.create("wf", run_id, CreateWorkflowMode::BrandNew).unwrap();
        update(&fx, mutation(&fx, run_id, 3, 7)).unwrap();
        let err = update(&fx, mutation(&fx, run_id, 3, 7)).unwrap_err();
        assert!(matches!(err, PersistenceError::ConditionFailed(_)), "{:?}", err);
        assert_eq!(read(&fx, run_id).execution_info.next_event_id, 7);
    }

    #[test]
    fn test_update_of_non_current_run() {
        let fx = Fixture::new();
        let first = RunId::new();
        let second = RunId::new();
        fx.create("wf", first, CreateWorkflowMode::BrandNew).unwrap();
        fx.create(
            "wf",
            second,
            CreateWorkflowMode::ContinueAsNew {
                previous_run_id: first,
            },
        )
        .unwrap();
        let err = update(&fx, mutation(&fx, first, 3, 5)).unwrap_err();
        assert!(matches!(err, PersistenceError::CurrentWorkflowConditionFailed(_)));
    }

    #[test]
    fn test_sub_collection_upserts_and_deletes() {
        let fx = Fixture::new();
        let run_id = RunId::new();
        fx.create("wf", run_id, CreateWorkflowMode::BrandNew).unwrap();

        let mut m = mutation(&fx, run_id, 3, 5);
        for id in ["a", "b"] {
            m.upsert_timer_infos.push(TimerInfo {
                version: 1,
                timer_id: id.into(),
                started_id: 4,
                expiry_time: Utc::now(),
                task_id: 9,
            });
        }
        m.upsert_signal_infos.push(SignalInfo {
            version: 1,
            initiated_id: 4,
            signal_request_id: "s".into(),
            signal_name: "ping".into(),
            input: vec![1],
            control: vec![],
        });
        m.upsert_signal_requested_ids.push("r-1".into());
        m.new_buffered_events = Some(DataBlob::new(EncodingType::ThriftRw, vec![7]));
        update(&fx, m).unwrap();

        let mut m = mutation(&fx, run_id, 5, 6);
        m.delete_timer_infos.push("a".into());
        m.delete_signal_requested_ids.push("r-1".into());
        m.new_buffered_events = Some(DataBlob::new(EncodingType::ThriftRw, vec![8]));
        update(&fx, m).unwrap();

        let state = read(&fx, run_id);
        assert_eq!(state.timer_infos.keys().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(state.signal_infos[&4].signal_name, "ping");
        assert!(state.signal_requested.is_empty());
        assert_eq!(state.buffered_events.len(), 2);

        let mut m = mutation(&fx, run_id, 6, 6);
        m.clear_buffered_events = true;
        update(&fx, m).unwrap();
        assert!(read(&fx, run_id).buffered_events.is_empty());
    }

    #[test]
    fn test_continue_as_new_in_update() {
        let fx = Fixture::new();
        let first = RunId::new();
        fx.create("wf", first, CreateWorkflowMode::BrandNew).unwrap();

        let mut m = mutation(&fx, first, 3, 9);
        m.execution_info.state = WorkflowState::Completed;
        m.execution_info.close_status = CloseStatus::ContinuedAsNew;
        let second = RunId::new();
        fx.store
            .update_workflow_execution(&UpdateWorkflowExecutionRequest {
                range_id: RANGE,
                mutation: m,
                new_workflow: Some(fx.snapshot("wf", second)),
            })
            .unwrap();

        assert_eq!(
            fx.store.get_current_execution(fx.domain_id, "wf").unwrap().run_id,
            second
        );
        assert_eq!(
            read(&fx, first).execution_info.close_status,
            CloseStatus::ContinuedAsNew
        );
    }

    #[test]
    fn test_zombie_update_skips_pointer() {
        let fx = Fixture::new();
        let current = RunId::new();
        fx.create("wf", current, CreateWorkflowMode::BrandNew).unwrap();
        let zombie = RunId::new();
        let mut info = fx.info("wf", zombie);
        info.state = WorkflowState::Zombie;
        fx.store
            .create_workflow_execution(&super::super::CreateWorkflowExecutionRequest {
                range_id: RANGE,
                mode: CreateWorkflowMode::Zombie,
                new_workflow: WorkflowSnapshot::new(
                    WorkflowMutableState::new(info.clone(), ReplicationMode::Legacy),
                    0,
                ),
            })
            .unwrap();

        info.next_event_id = 4;
        update(&fx, WorkflowMutation::new(info, ReplicationMode::Legacy, 3)).unwrap();
        assert_eq!(
            fx.store.get_current_execution(fx.domain_id, "wf").unwrap().run_id,
            current
        );
        assert_eq!(read(&fx, zombie).execution_info.next_event_id, 4);
    }

    #[test]
    fn test_update_after_shard_stolen() {
        let fx = Fixture::new();
        let run_id = RunId::new();
        fx.create("wf", run_id, CreateWorkflowMode::BrandNew).unwrap();
        fx.steal_shard();
        let err = update(&fx, mutation(&fx, run_id, 3, 5)).unwrap_err();
        assert!(err.is_ownership_lost());
        assert_eq!(read(&fx, run_id).execution_info.next_event_id, 3);
    }

    #[test]
    fn test_update_rejects_backwards_history() {
        let fx = Fixture::new();
        let err = update(&fx, mutation(&fx, RunId::new(), 5, 4)).unwrap_err();
        assert!(matches!(err, PersistenceError::Internal(_)));
    }

    #[test]
    fn test_unapplied_timeout_is_ambiguous() {
        let fx = Fixture::new();
        let run_id = RunId::new();
        fx.create("wf", run_id, CreateWorkflowMode::BrandNew).unwrap();

        fx.backend.inject_fault(Fault::Timeout { applied: false });
        let err = update(&fx, mutation(&fx, run_id, 3, 5)).unwrap_err();
        assert!(matches!(err, PersistenceError::AmbiguousOutcome(_)), "{:?}", err);

        // nothing landed, so the same mutation still applies
        assert_eq!(read(&fx, run_id).execution_info.next_event_id, 3);
        update(&fx, mutation(&fx, run_id, 3, 5)).unwrap();
        assert_eq!(read(&fx, run_id).execution_info.next_event_id, 5);
    }

    #[test]
    fn test_zombie_update_of_current_run_is_internal() {
        let fx = Fixture::new();
        let run_id = RunId::new();
        fx.create("wf", run_id, CreateWorkflowMode::BrandNew).unwrap();

        let mut m = mutation(&fx, run_id, 3, 5);
        m.execution_info.state = WorkflowState::Zombie;
        let err = update(&fx, m).unwrap_err();
        match err {
            PersistenceError::Internal(message) => assert!(message.contains("is current")),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(read(&fx, run_id).execution_info.next_event_id, 3);
    }

    #[test]
    fn test_update_switches_to_version_histories() {
        let fx = Fixture::new();
        let run_id = RunId::new();
        let mut snapshot = fx.snapshot("wf", run_id);
        snapshot.state.replication = ReplicationMode::ReplicationState(ReplicationState {
            current_version: 7,
            start_version: 7,
            last_write_version: 7,
            last_write_event_id: 2,
            last_replication_info: BTreeMap::new(),
        });
        fx.store
            .create_workflow_execution(&super::super::CreateWorkflowExecutionRequest {
                range_id: RANGE,
                mode: CreateWorkflowMode::BrandNew,
                new_workflow: snapshot,
            })
            .unwrap();
        assert_eq!(
            fx.store.get_current_execution(fx.domain_id, "wf").unwrap().last_write_version,
            7
        );

        let histories = DataBlob::new(EncodingType::ThriftRw, vec![1, 2, 3]);
        let mut m = mutation(&fx, run_id, 3, 5);
        m.replication = ReplicationMode::VersionHistories(histories.clone());
        update(&fx, m).unwrap();

        let state = read(&fx, run_id);
        assert_eq!(state.replication, ReplicationMode::VersionHistories(histories));
        assert_eq!(state.execution_info.next_event_id, 5);
        assert_eq!(
            fx.store.get_current_execution(fx.domain_id, "wf").unwrap().last_write_version,
            EMPTY_VERSION
        );
    }
}
