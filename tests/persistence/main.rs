//! Persistence Integration Test Suite
//!
//! Drives the public facade against the in-memory backend.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all persistence tests
//! cargo test --test persistence
//!
//! # Run task list tests only
//! cargo test --test persistence task_lists::
//! ```

use chrono::Utc;
use fencepost::prelude::*;
use fencepost::records::{ActivityInfo, SignalInfo, TimerInfo};

// Test modules
pub mod collections;
pub mod concurrent_create;
pub mod config_file;
pub mod lifecycle;
pub mod queues;
pub mod shard_lease;
pub mod task_lists;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Shard every test runs on
pub const SHARD: i32 = 7;

/// Token the shard is created with
pub const RANGE: i64 = 1;

/// Route store logs to the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Persistence with one shard already created
pub struct Env {
    pub persistence: Persistence,
    pub domain_id: DomainId,
}

impl Env {
    pub fn new() -> Self {
        init_tracing();
        let persistence = Persistence::ephemeral();
        persistence
            .shard_store()
            .create_shard(&ShardRecord::new(SHARD, "host-a", RANGE))
            .expect("Failed to create shard");
        Self {
            persistence,
            domain_id: DomainId::new(),
        }
    }

    pub fn executions(&self) -> ExecutionStore {
        self.persistence.execution_store(SHARD)
    }

    pub fn queues(&self) -> QueueStore {
        self.persistence.queue_store(SHARD)
    }

    /// A freshly started run with two events in its history
    pub fn info(&self, workflow_id: &str, run_id: RunId) -> WorkflowExecutionInfo {
        let mut info = WorkflowExecutionInfo::new(self.domain_id, workflow_id, run_id);
        info.create_request_id = format!("create-{}", run_id);
        info.state = WorkflowState::Running;
        info.next_event_id = 3;
        info
    }

    pub fn snapshot(&self, workflow_id: &str, run_id: RunId) -> WorkflowSnapshot {
        WorkflowSnapshot::new(
            WorkflowMutableState::new(self.info(workflow_id, run_id), ReplicationMode::Legacy),
            0,
        )
    }

    pub fn create(&self, snapshot: WorkflowSnapshot, mode: CreateWorkflowMode) -> Result<()> {
        self.executions()
            .create_workflow_execution(&CreateWorkflowExecutionRequest {
                range_id: RANGE,
                mode,
                new_workflow: snapshot,
            })
    }

    /// Start a brand new run of `workflow_id`
    pub fn start(&self, workflow_id: &str) -> RunId {
        let run_id = RunId::new();
        self.create(self.snapshot(workflow_id, run_id), CreateWorkflowMode::BrandNew)
            .expect("Failed to start workflow");
        run_id
    }

    pub fn load(&self, workflow_id: &str, run_id: RunId) -> WorkflowMutableState {
        self.executions()
            .get_workflow_execution(self.domain_id, &WorkflowExecution::new(workflow_id, run_id))
            .expect("Failed to load run")
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

pub fn activity(schedule_id: i64) -> ActivityInfo {
    let now = Utc::now();
    ActivityInfo {
        version: 0,
        schedule_id,
        scheduled_event_batch_id: schedule_id - 1,
        scheduled_event: None,
        scheduled_time: now,
        started_id: -23,
        started_event: None,
        started_time: now,
        activity_id: format!("activity-{}", schedule_id),
        request_id: format!("request-{}", schedule_id),
        details: vec![],
        schedule_to_start_timeout_secs: 10,
        schedule_to_close_timeout_secs: 60,
        start_to_close_timeout_secs: 50,
        heartbeat_timeout_secs: 0,
        cancel_requested: false,
        cancel_request_id: -23,
        last_heartbeat_updated_time: now,
        timer_task_status: 0,
        attempt: 0,
        task_list: "workers".into(),
        started_identity: String::new(),
        has_retry_policy: true,
        initial_interval_secs: 1,
        backoff_coefficient: 2.0,
        maximum_interval_secs: 30,
        expiration_time: None,
        maximum_attempts: 5,
        non_retriable_errors: vec!["fatal".into()],
    }
}

pub fn timer(timer_id: &str, started_id: i64) -> TimerInfo {
    TimerInfo {
        version: 0,
        timer_id: timer_id.to_string(),
        started_id,
        expiry_time: Utc::now(),
        task_id: started_id * 10,
    }
}

pub fn signal(initiated_id: i64) -> SignalInfo {
    SignalInfo {
        version: 0,
        initiated_id,
        signal_request_id: format!("signal-{}", initiated_id),
        signal_name: "poke".into(),
        input: vec![initiated_id as u8],
        control: vec![],
    }
}
