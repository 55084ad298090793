//! Workflow lifecycle tests
//!
//! Start, advance, continue, reset and delete runs through the facade, and
//! check the current pointer after each step.

use crate::*;

fn advance(env: &Env, state: &WorkflowMutableState, events: i64) -> Result<()> {
    let mut info = state.execution_info.clone();
    let condition = info.next_event_id;
    info.next_event_id += events;
    env.executions()
        .update_workflow_execution(&UpdateWorkflowExecutionRequest {
            range_id: RANGE,
            mutation: WorkflowMutation::new(info, state.replication.clone(), condition),
            new_workflow: None,
        })
}

fn current(env: &Env, workflow_id: &str) -> CurrentExecution {
    env.executions()
        .get_current_execution(env.domain_id, workflow_id)
        .unwrap()
}

#[test]
fn test_start_sets_current_pointer() {
    let env = Env::new();
    let run_id = env.start("order-1");

    let pointer = current(&env, "order-1");
    assert_eq!(pointer.run_id, run_id);
    assert_eq!(pointer.create_request_id, format!("create-{}", run_id));
    assert_eq!(pointer.state, WorkflowState::Running);

    let state = env.load("order-1", run_id);
    assert_eq!(state.execution_info.next_event_id, 3);
}

#[test]
fn test_update_advances_and_stale_replay_fails() {
    let env = Env::new();
    let run_id = env.start("order-1");
    let before = env.load("order-1", run_id);

    advance(&env, &before, 4).unwrap();
    assert_eq!(env.load("order-1", run_id).execution_info.next_event_id, 7);

    let err = advance(&env, &before, 4).unwrap_err();
    assert!(matches!(err, PersistenceError::ConditionFailed(_)));
    assert!(err.is_conflict());
    assert_eq!(env.load("order-1", run_id).execution_info.next_event_id, 7);
}

#[test]
fn test_continue_as_new_moves_pointer() {
    let env = Env::new();
    let first = env.start("order-1");
    let state = env.load("order-1", first);

    let mut closing = state.execution_info.clone();
    closing.state = WorkflowState::Completed;
    closing.close_status = CloseStatus::ContinuedAsNew;
    closing.next_event_id = 5;
    let second = RunId::new();
    env.executions()
        .update_workflow_execution(&UpdateWorkflowExecutionRequest {
            range_id: RANGE,
            mutation: WorkflowMutation::new(closing, ReplicationMode::Legacy, 3),
            new_workflow: Some(env.snapshot("order-1", second)),
        })
        .unwrap();

    assert_eq!(current(&env, "order-1").run_id, second);
    let closed = env.load("order-1", first);
    assert_eq!(closed.execution_info.close_status, CloseStatus::ContinuedAsNew);
}

#[test]
fn test_start_after_close_with_previous_run() {
    let env = Env::new();
    let first = env.start("order-1");
    let state = env.load("order-1", first);

    let mut closing = state.execution_info.clone();
    closing.state = WorkflowState::Completed;
    closing.close_status = CloseStatus::Completed;
    closing.next_event_id = 4;
    env.executions()
        .update_workflow_execution(&UpdateWorkflowExecutionRequest {
            range_id: RANGE,
            mutation: WorkflowMutation::new(closing, ReplicationMode::Legacy, 3),
            new_workflow: None,
        })
        .unwrap();
    assert_eq!(current(&env, "order-1").state, WorkflowState::Completed);

    let err = env
        .create(env.snapshot("order-1", RunId::new()), CreateWorkflowMode::BrandNew)
        .unwrap_err();
    match err {
        PersistenceError::WorkflowExecutionAlreadyStarted {
            run_id,
            state,
            close_status,
            ..
        } => {
            assert_eq!(run_id, first);
            assert_eq!(state, WorkflowState::Completed);
            assert_eq!(close_status, CloseStatus::Completed);
        }
        other => panic!("expected WorkflowExecutionAlreadyStarted, got {:?}", other),
    }

    let second = RunId::new();
    env.create(
        env.snapshot("order-1", second),
        CreateWorkflowMode::WorkflowIdReuse {
            previous_run_id: first,
            previous_last_write_version: fencepost_core::EMPTY_VERSION,
        },
    )
    .unwrap();
    assert_eq!(current(&env, "order-1").run_id, second);
}

#[test]
fn test_reset_forks_new_current_run() {
    let env = Env::new();
    let first = env.start("order-1");
    let state = env.load("order-1", first);

    let mut terminated = state.execution_info.clone();
    terminated.state = WorkflowState::Completed;
    terminated.close_status = CloseStatus::Terminated;
    terminated.next_event_id = 4;
    let reset_run = RunId::new();
    env.executions()
        .reset_workflow_execution(&ResetWorkflowExecutionRequest {
            range_id: RANGE,
            base_run_id: first,
            base_run_next_event_id: 3,
            current: CurrentRunAction::Update(WorkflowMutation::new(
                terminated,
                ReplicationMode::Legacy,
                3,
            )),
            current_run_guard: None,
            new_workflow: env.snapshot("order-1", reset_run),
        })
        .unwrap();

    assert_eq!(current(&env, "order-1").run_id, reset_run);
    assert_eq!(
        env.load("order-1", first).execution_info.close_status,
        CloseStatus::Terminated
    );
}

#[test]
fn test_delete_run_and_pointer() {
    let env = Env::new();
    let run_id = env.start("order-1");
    let execution = WorkflowExecution::new("order-1", run_id);

    env.executions()
        .delete_current_workflow_execution(env.domain_id, &execution)
        .unwrap();
    env.executions()
        .delete_workflow_execution(env.domain_id, &execution)
        .unwrap();

    assert!(env
        .executions()
        .get_current_execution(env.domain_id, "order-1")
        .unwrap_err()
        .is_not_found());
    assert!(env
        .executions()
        .get_workflow_execution(env.domain_id, &execution)
        .unwrap_err()
        .is_not_found());

    // Starting again after the pointer is gone is a brand new start
    env.start("order-1");
}
