//! Concurrent create tests
//!
//! Racing creators of the same workflow id: exactly one wins, every loser
//! is told who won, and the winner's state is left intact.

use crate::*;
use std::sync::Barrier;
use std::thread;

const RACERS: usize = 8;

#[test]
fn test_brand_new_race_has_one_winner() {
    let env = Env::new();
    let barrier = Barrier::new(RACERS);
    let run_ids: Vec<RunId> = (0..RACERS).map(|_| RunId::new()).collect();

    let results: Vec<(RunId, Result<()>)> = thread::scope(|scope| {
        let handles: Vec<_> = run_ids
            .iter()
            .map(|run_id| {
                let env = &env;
                let barrier = &barrier;
                scope.spawn(move || {
                    let snapshot = env.snapshot("contested", *run_id);
                    barrier.wait();
                    (*run_id, env.create(snapshot, CreateWorkflowMode::BrandNew))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("racer panicked"))
            .collect()
    });

    let winners: Vec<RunId> = results
        .iter()
        .filter(|(_, result)| result.is_ok())
        .map(|(run_id, _)| *run_id)
        .collect();
    assert_eq!(winners.len(), 1);
    let winner = winners[0];

    for (run_id, result) in &results {
        if *run_id == winner {
            continue;
        }
        match result {
            Err(PersistenceError::WorkflowExecutionAlreadyStarted {
                run_id: reported,
                create_request_id,
                ..
            }) => {
                assert_eq!(*reported, winner);
                assert_eq!(*create_request_id, format!("create-{}", winner));
            }
            other => panic!("expected WorkflowExecutionAlreadyStarted, got {:?}", other),
        }
    }

    let pointer = env
        .executions()
        .get_current_execution(env.domain_id, "contested")
        .unwrap();
    assert_eq!(pointer.run_id, winner);
    assert_eq!(env.load("contested", winner).execution_info.next_event_id, 3);
}

#[test]
fn test_continue_race_from_same_previous_run() {
    let env = Env::new();
    let previous = env.start("contested");
    let barrier = Barrier::new(RACERS);
    let run_ids: Vec<RunId> = (0..RACERS).map(|_| RunId::new()).collect();

    let results: Vec<(RunId, Result<()>)> = thread::scope(|scope| {
        let handles: Vec<_> = run_ids
            .iter()
            .map(|run_id| {
                let env = &env;
                let barrier = &barrier;
                scope.spawn(move || {
                    let snapshot = env.snapshot("contested", *run_id);
                    barrier.wait();
                    let mode = CreateWorkflowMode::ContinueAsNew {
                        previous_run_id: previous,
                    };
                    (*run_id, env.create(snapshot, mode))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("racer panicked"))
            .collect()
    });

    let winners: Vec<RunId> = results
        .iter()
        .filter(|(_, result)| result.is_ok())
        .map(|(run_id, _)| *run_id)
        .collect();
    assert_eq!(winners.len(), 1);

    for (_, result) in results.iter().filter(|(_, result)| result.is_err()) {
        assert!(matches!(
            result,
            Err(PersistenceError::CurrentWorkflowConditionFailed(_))
        ));
    }
    assert_eq!(
        env.executions()
            .get_current_execution(env.domain_id, "contested")
            .unwrap()
            .run_id,
        winners[0]
    );
}
