//! Shard lease tests
//!
//! A shard write fails with `ShardOwnershipLost` exactly when the token the
//! writer holds differs from the stored one.

use crate::*;

#[test]
fn test_create_and_get_shard() {
    let env = Env::new();
    let shard = env.persistence.shard_store().get_shard(SHARD).unwrap();
    assert_eq!(shard.owner, "host-a");
    assert_eq!(shard.range_id, RANGE);
}

#[test]
fn test_create_shard_twice_reports_owner() {
    let env = Env::new();
    let err = env
        .persistence
        .shard_store()
        .create_shard(&ShardRecord::new(SHARD, "host-b", 5))
        .unwrap_err();
    match err {
        PersistenceError::ShardAlreadyExists {
            shard_id,
            owner,
            range_id,
        } => {
            assert_eq!(shard_id, SHARD);
            assert_eq!(owner, "host-a");
            assert_eq!(range_id, RANGE);
        }
        other => panic!("expected ShardAlreadyExists, got {:?}", other),
    }
}

#[test]
fn test_update_shard_with_current_token() {
    let env = Env::new();
    let shards = env.persistence.shard_store();
    let mut shard = shards.get_shard(SHARD).unwrap();
    shard.owner = "host-b".into();
    shard.range_id = RANGE + 1;
    shards.update_shard(&shard, RANGE).unwrap();

    let stored = shards.get_shard(SHARD).unwrap();
    assert_eq!(stored.owner, "host-b");
    assert_eq!(stored.range_id, RANGE + 1);
}

#[test]
fn test_update_shard_with_stale_token() {
    let env = Env::new();
    let shards = env.persistence.shard_store();
    let mut shard = shards.get_shard(SHARD).unwrap();
    shard.range_id = RANGE + 1;
    shards.update_shard(&shard, RANGE).unwrap();

    let mut stale = shard.clone();
    stale.range_id = RANGE + 2;
    let err = shards.update_shard(&stale, RANGE).unwrap_err();
    assert!(err.is_ownership_lost());
    assert!(!err.is_retryable());
}

#[test]
fn test_execution_writes_fenced_by_shard_token() {
    let env = Env::new();
    let shards = env.persistence.shard_store();
    let mut shard = shards.get_shard(SHARD).unwrap();
    shard.range_id = RANGE + 1;
    shards.update_shard(&shard, RANGE).unwrap();

    let run_id = RunId::new();
    let err = env
        .create(env.snapshot("wf", run_id), CreateWorkflowMode::BrandNew)
        .unwrap_err();
    assert!(err.is_ownership_lost());
    assert!(env
        .executions()
        .get_current_execution(env.domain_id, "wf")
        .unwrap_err()
        .is_not_found());

    env.executions()
        .create_workflow_execution(&CreateWorkflowExecutionRequest {
            range_id: RANGE + 1,
            mode: CreateWorkflowMode::BrandNew,
            new_workflow: env.snapshot("wf", run_id),
        })
        .unwrap();
}

#[test]
fn test_missing_shard() {
    let env = Env::new();
    let err = env.persistence.shard_store().get_shard(SHARD + 1).unwrap_err();
    assert!(err.is_not_found());
}
