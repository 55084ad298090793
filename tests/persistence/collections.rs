//! Property tests for run sub-collections
//!
//! Whatever order entries are written in, and whether they arrive through a
//! full snapshot or an incremental mutation, reading the run back yields the
//! same keys and the same values.

use crate::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn shuffled_ids() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(1i64..10_000, 0..12)
        .prop_map(|ids| ids.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

fn shuffled_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{1,6}", 0..8)
        .prop_map(|names| names.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn mutation_entries_read_back(
        activity_ids in shuffled_ids(),
        timer_ids in shuffled_names(),
        signal_ids in shuffled_ids(),
    ) {
        let env = Env::new();
        let run_id = env.start("wf");

        let activities: Vec<_> = activity_ids.iter().map(|id| activity(*id)).collect();
        let timers: Vec<_> = timer_ids.iter().enumerate().map(|(i, id)| timer(id, i as i64)).collect();
        let signals: Vec<_> = signal_ids.iter().map(|id| signal(*id)).collect();

        let mut info = env.info("wf", run_id);
        info.next_event_id = 10;
        let mut mutation = WorkflowMutation::new(info, ReplicationMode::Legacy, 3);
        mutation.upsert_activity_infos = activities.clone();
        mutation.upsert_timer_infos = timers.clone();
        mutation.upsert_signal_infos = signals.clone();
        mutation.upsert_signal_requested_ids = timer_ids.clone();
        env.executions()
            .update_workflow_execution(&UpdateWorkflowExecutionRequest {
                range_id: RANGE,
                mutation,
                new_workflow: None,
            })
            .unwrap();

        let state = env.load("wf", run_id);
        let expected_activities: BTreeMap<_, _> =
            activities.into_iter().map(|a| (a.schedule_id, a)).collect();
        let expected_timers: BTreeMap<_, _> =
            timers.into_iter().map(|t| (t.timer_id.clone(), t)).collect();
        let expected_signals: BTreeMap<_, _> =
            signals.into_iter().map(|s| (s.initiated_id, s)).collect();
        let expected_requested: BTreeSet<_> = timer_ids.into_iter().collect();

        prop_assert_eq!(&state.activity_infos, &expected_activities);
        prop_assert_eq!(&state.timer_infos, &expected_timers);
        prop_assert_eq!(&state.signal_infos, &expected_signals);
        prop_assert_eq!(&state.signal_requested, &expected_requested);
    }

    #[test]
    fn snapshot_and_mutation_agree(activity_ids in shuffled_ids(), timer_ids in shuffled_names()) {
        let env = Env::new();

        let activities: Vec<_> = activity_ids.iter().map(|id| activity(*id)).collect();
        let timers: Vec<_> = timer_ids.iter().enumerate().map(|(i, id)| timer(id, i as i64)).collect();

        let snapshot_run = RunId::new();
        let mut snapshot = env.snapshot("from-snapshot", snapshot_run);
        snapshot.state.activity_infos =
            activities.iter().map(|a| (a.schedule_id, a.clone())).collect();
        snapshot.state.timer_infos =
            timers.iter().map(|t| (t.timer_id.clone(), t.clone())).collect();
        env.create(snapshot, CreateWorkflowMode::BrandNew).unwrap();

        let mutated_run = env.start("from-mutation");
        let mut mutation = WorkflowMutation::new(
            env.info("from-mutation", mutated_run),
            ReplicationMode::Legacy,
            3,
        );
        mutation.upsert_activity_infos = activities.into_iter().rev().collect();
        mutation.upsert_timer_infos = timers.into_iter().rev().collect();
        env.executions()
            .update_workflow_execution(&UpdateWorkflowExecutionRequest {
                range_id: RANGE,
                mutation,
                new_workflow: None,
            })
            .unwrap();

        let from_snapshot = env.load("from-snapshot", snapshot_run);
        let from_mutation = env.load("from-mutation", mutated_run);
        prop_assert_eq!(from_snapshot.activity_infos, from_mutation.activity_infos);
        prop_assert_eq!(from_snapshot.timer_infos, from_mutation.timer_infos);
    }
}

#[test]
fn test_delete_entries() {
    let env = Env::new();
    let run_id = env.start("wf");

    let mut mutation = WorkflowMutation::new(env.info("wf", run_id), ReplicationMode::Legacy, 3);
    mutation.upsert_activity_infos = vec![activity(5), activity(6)];
    mutation.upsert_signal_infos = vec![signal(8)];
    env.executions()
        .update_workflow_execution(&UpdateWorkflowExecutionRequest {
            range_id: RANGE,
            mutation,
            new_workflow: None,
        })
        .unwrap();

    let mut mutation = WorkflowMutation::new(env.info("wf", run_id), ReplicationMode::Legacy, 3);
    mutation.delete_activity_infos = vec![5];
    mutation.delete_signal_infos = vec![8, 9];
    env.executions()
        .update_workflow_execution(&UpdateWorkflowExecutionRequest {
            range_id: RANGE,
            mutation,
            new_workflow: None,
        })
        .unwrap();

    let state = env.load("wf", run_id);
    assert_eq!(state.activity_infos.keys().copied().collect::<Vec<_>>(), vec![6]);
    assert!(state.signal_infos.is_empty());
}
