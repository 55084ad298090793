//! Task list tests

use crate::*;

fn key(env: &Env) -> TaskListKey {
    TaskListKey::new(env.domain_id, "checkout", TaskListType::Activity)
}

fn task(env: &Env, task_id: i64) -> TaskInfo {
    TaskInfo {
        domain_id: env.domain_id,
        workflow_id: format!("wf-{}", task_id),
        run_id: RunId::new(),
        task_id,
        schedule_id: 5,
        schedule_to_start_timeout_secs: 0,
        created_time: Utc::now(),
        expiry: None,
    }
}

fn lease(store: &TaskListStore, key: &TaskListKey, range_id: i64) -> Result<TaskListInfo> {
    store.lease_task_list(&LeaseTaskListRequest {
        key: key.clone(),
        range_id,
        kind: TaskListKind::Normal,
    })
}

fn read(store: &TaskListStore, key: &TaskListKey, read_level: i64, max_read_level: i64) -> Vec<i64> {
    store
        .get_tasks(&GetTasksRequest {
            key: key.clone(),
            read_level,
            max_read_level,
            batch_size: 100,
        })
        .unwrap()
        .iter()
        .map(|t| t.task_id)
        .collect()
}

#[test]
fn test_lease_create_get_complete() {
    let env = Env::new();
    let store = env.persistence.task_list_store();
    let key = key(&env);

    let info = lease(&store, &key, 0).unwrap();
    assert_eq!(info.range_id, 1);

    store
        .create_tasks(&CreateTasksRequest {
            task_list: info,
            tasks: vec![task(&env, 1), task(&env, 2), task(&env, 3)],
        })
        .unwrap();
    assert_eq!(read(&store, &key, 0, 3), vec![1, 2, 3]);

    store.complete_task(&key, 2).unwrap();
    assert_eq!(read(&store, &key, 0, 3), vec![1, 3]);
}

#[test]
fn test_stolen_list_rejects_old_owner() {
    let env = Env::new();
    let store = env.persistence.task_list_store();
    let key = key(&env);

    let first = lease(&store, &key, 0).unwrap();
    let second = lease(&store, &key, 0).unwrap();
    assert_eq!(second.range_id, first.range_id + 1);

    let err = store
        .create_tasks(&CreateTasksRequest {
            task_list: first.clone(),
            tasks: vec![task(&env, 1)],
        })
        .unwrap_err();
    assert!(matches!(err, PersistenceError::ConditionFailed(_)));

    let err = lease(&store, &key, first.range_id).unwrap_err();
    assert!(matches!(err, PersistenceError::ConditionFailed(_)));

    let mut acked = second.clone();
    acked.ack_level = 10;
    store.update_task_list(&acked).unwrap();
    assert!(store.update_task_list(&first).is_err());
    assert_eq!(lease(&store, &key, second.range_id).unwrap().ack_level, 10);
}

#[test]
fn test_complete_less_than_reports_unknown() {
    let env = Env::new();
    let store = env.persistence.task_list_store();
    let key = key(&env);
    let info = lease(&store, &key, 0).unwrap();
    store
        .create_tasks(&CreateTasksRequest {
            task_list: info,
            tasks: (1..=6).map(|id| task(&env, id)).collect(),
        })
        .unwrap();

    assert_eq!(
        store.complete_tasks_less_than(&key, 4).unwrap(),
        RowsAffected::Unknown
    );
    assert_eq!(read(&store, &key, 0, 10), vec![5, 6]);
}

#[test]
fn test_lists_are_isolated_by_type() {
    let env = Env::new();
    let store = env.persistence.task_list_store();
    let activities = key(&env);
    let decisions = TaskListKey::new(env.domain_id, "checkout", TaskListType::Decision);

    let info = lease(&store, &activities, 0).unwrap();
    lease(&store, &decisions, 0).unwrap();
    store
        .create_tasks(&CreateTasksRequest {
            task_list: info,
            tasks: vec![task(&env, 1)],
        })
        .unwrap();

    assert_eq!(read(&store, &activities, 0, 10), vec![1]);
    assert!(read(&store, &decisions, 0, 10).is_empty());
}

#[test]
fn test_delete_task_list() {
    let env = Env::new();
    let store = env.persistence.task_list_store();
    let key = key(&env);
    let info = lease(&store, &key, 0).unwrap();

    assert!(store.delete_task_list(&key, info.range_id + 5).is_err());
    store.delete_task_list(&key, info.range_id).unwrap();
    assert_eq!(lease(&store, &key, 0).unwrap().range_id, 1);
}
