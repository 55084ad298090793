//! Queue tests
//!
//! Queue entries are enqueued by run mutations and drained through the
//! queue store.

use crate::*;
use chrono::{DateTime, Duration, TimeZone};
use fencepost::records::{TimerTaskInfo, TimerTaskType, TransferTaskInfo, TransferTaskType};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn timer_task(info: &WorkflowExecutionInfo, fire_at: DateTime<Utc>, task_id: i64) -> TimerTaskInfo {
    TimerTaskInfo {
        domain_id: info.domain_id,
        workflow_id: info.workflow_id.clone(),
        run_id: info.run_id,
        visibility_timestamp: fire_at,
        task_id,
        task_type: TimerTaskType::UserTimer,
        timeout_type: 0,
        event_id: 5,
        schedule_attempt: 0,
        version: 0,
    }
}

fn transfer_task(info: &WorkflowExecutionInfo, task_id: i64) -> TransferTaskInfo {
    TransferTaskInfo {
        domain_id: info.domain_id,
        workflow_id: info.workflow_id.clone(),
        run_id: info.run_id,
        task_id,
        task_type: TransferTaskType::DecisionTask,
        target_domain_id: info.domain_id,
        target_workflow_id: info.workflow_id.clone(),
        target_run_id: None,
        target_child_workflow_only: false,
        task_list: "workers".into(),
        schedule_id: 2,
        version: 0,
        visibility_timestamp: Utc::now(),
        record_visibility: false,
    }
}

/// Start a run whose create batch carries `tasks`
fn start_with(env: &Env, workflow_id: &str, build: impl FnOnce(&WorkflowExecutionInfo) -> Tasks) {
    let mut snapshot = env.snapshot(workflow_id, RunId::new());
    snapshot.tasks = build(&snapshot.state.execution_info);
    env.create(snapshot, CreateWorkflowMode::BrandNew).unwrap();
}

fn timer_ids(queues: &QueueStore, min: DateTime<Utc>, max: DateTime<Utc>) -> Vec<i64> {
    queues
        .get_timer_index_tasks(&GetTimerIndexTasksRequest {
            min_timestamp: min,
            max_timestamp: max,
            batch_size: 100,
            next_page_token: None,
        })
        .unwrap()
        .tasks
        .iter()
        .map(|t| t.task_id)
        .collect()
}

#[test]
fn test_range_complete_timers_is_half_open() {
    let env = Env::new();
    start_with(&env, "timers", |info| Tasks {
        timer: vec![
            timer_task(info, at(0), 1),
            timer_task(info, at(10), 2),
            timer_task(info, at(15), 3),
            timer_task(info, at(20), 4),
            timer_task(info, at(30), 5),
        ],
        ..Tasks::none()
    });
    let queues = env.queues();
    assert_eq!(timer_ids(&queues, at(0), at(60)), vec![1, 2, 3, 4, 5]);

    queues.range_complete_timer_task(at(10), at(20)).unwrap();

    assert_eq!(timer_ids(&queues, at(-60), at(60)), vec![1, 4, 5]);
}

#[test]
fn test_timer_order_breaks_ties_by_task_id() {
    let env = Env::new();
    start_with(&env, "timers", |info| Tasks {
        timer: vec![
            timer_task(info, at(5), 9),
            timer_task(info, at(5), 2),
            timer_task(info, at(1), 7),
        ],
        ..Tasks::none()
    });
    assert_eq!(timer_ids(&env.queues(), at(0), at(10)), vec![7, 2, 9]);
}

#[test]
fn test_transfer_tasks_from_update_and_drain() {
    let env = Env::new();
    let run_id = env.start("transfers");
    let info = env.info("transfers", run_id);

    let mut mutation = WorkflowMutation::new(info.clone(), ReplicationMode::Legacy, 3);
    mutation.tasks.transfer = (100..105).map(|id| transfer_task(&info, id)).collect();
    env.executions()
        .update_workflow_execution(&UpdateWorkflowExecutionRequest {
            range_id: RANGE,
            mutation,
            new_workflow: None,
        })
        .unwrap();

    let queues = env.queues();
    let mut request = GetQueueTasksRequest {
        read_level: 99,
        max_read_level: 104,
        batch_size: 2,
        next_page_token: None,
    };
    let mut drained = Vec::new();
    loop {
        let page = queues.get_transfer_tasks(&request).unwrap();
        drained.extend(page.tasks.iter().map(|t| t.task_id));
        match page.next_page_token {
            Some(token) => request.next_page_token = Some(token),
            None => break,
        }
    }
    assert_eq!(drained, vec![100, 101, 102, 103, 104]);

    queues.range_complete_transfer_task(99, 102).unwrap();
    queues.complete_transfer_task(104).unwrap();
    let remaining = queues
        .get_transfer_tasks(&GetQueueTasksRequest {
            read_level: 0,
            max_read_level: 1_000,
            batch_size: 0,
            next_page_token: None,
        })
        .unwrap();
    assert_eq!(
        remaining.tasks.iter().map(|t| t.task_id).collect::<Vec<_>>(),
        vec![103]
    );
}

#[test]
fn test_completing_absent_tasks_is_a_no_op() {
    let env = Env::new();
    let queues = env.queues();
    queues.complete_transfer_task(42).unwrap();
    queues.range_complete_transfer_task(0, 1_000).unwrap();
    queues.complete_replication_task(42).unwrap();
    queues.range_complete_replication_task(0, 1_000).unwrap();
    queues.complete_timer_task(at(0), 42).unwrap();
    queues
        .range_complete_timer_task(at(0), at(0) + Duration::hours(1))
        .unwrap();
}

#[test]
fn test_queue_tasks_not_written_when_batch_rejected() {
    let env = Env::new();
    env.start("dup");
    let mut snapshot = env.snapshot("dup", RunId::new());
    let info = snapshot.state.execution_info.clone();
    snapshot.tasks.transfer.push(transfer_task(&info, 1));
    snapshot.tasks.timer.push(timer_task(&info, at(0), 1));
    assert!(env.create(snapshot, CreateWorkflowMode::BrandNew).is_err());

    let queues = env.queues();
    assert!(queues
        .get_transfer_tasks(&GetQueueTasksRequest {
            read_level: 0,
            max_read_level: 10,
            batch_size: 10,
            next_page_token: None,
        })
        .unwrap()
        .tasks
        .is_empty());
    assert!(timer_ids(&queues, at(-10), at(10)).is_empty());
}
