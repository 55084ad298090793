//! Request types of the execution store

use fencepost_core::records::{
    ActivityInfo, ChildExecutionInfo, ReplicationMode, RequestCancelInfo, SignalInfo, Tasks,
    TimerInfo, WorkflowExecutionInfo, WorkflowMutableState, WorkflowState,
};
use fencepost_core::{DataBlob, RunId};

/// How a new run relates to the current pointer of its workflow id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateWorkflowMode {
    /// First run of the workflow id; the pointer must not exist
    BrandNew,
    /// Replaces `previous_run_id`, which must be current
    ContinueAsNew {
        /// Run the pointer must name
        previous_run_id: RunId,
    },
    /// Reuses the id of a closed run
    ///
    /// The previous run must be current, completed and still at
    /// `previous_last_write_version`. A new run without replication state
    /// has no version to compare and is guarded like `ContinueAsNew`.
    WorkflowIdReuse {
        /// Run the pointer must name
        previous_run_id: RunId,
        /// Last write version the pointer must carry
        previous_last_write_version: i64,
    },
    /// Replicated run that must never become current; the pointer is not
    /// touched
    Zombie,
}

impl CreateWorkflowMode {
    /// Run the pointer is expected to name, if any
    pub fn previous_run_id(&self) -> Option<RunId> {
        match self {
            CreateWorkflowMode::ContinueAsNew { previous_run_id }
            | CreateWorkflowMode::WorkflowIdReuse {
                previous_run_id, ..
            } => Some(*previous_run_id),
            CreateWorkflowMode::BrandNew | CreateWorkflowMode::Zombie => None,
        }
    }
}

/// Full state of a run plus the queue entries written with it
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSnapshot {
    /// Run state, including every sub-collection
    pub state: WorkflowMutableState,
    /// Queue entries
    pub tasks: Tasks,
    /// `next_event_id` the stored run must have when the snapshot replaces
    /// an existing row
    pub condition: i64,
}

impl WorkflowSnapshot {
    /// Snapshot without queue entries
    pub fn new(state: WorkflowMutableState, condition: i64) -> Self {
        Self {
            state,
            tasks: Tasks::none(),
            condition,
        }
    }
}

/// Incremental change to an existing run
///
/// Sub-collection entries are upserted or deleted one by one; everything
/// shares the single `next_event_id` gate in `condition`.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowMutation {
    /// New scalar state
    pub execution_info: WorkflowExecutionInfo,
    /// New replication tracking
    pub replication: ReplicationMode,
    /// Activities to upsert
    pub upsert_activity_infos: Vec<ActivityInfo>,
    /// Scheduled ids of activities to delete
    pub delete_activity_infos: Vec<i64>,
    /// Timers to upsert
    pub upsert_timer_infos: Vec<TimerInfo>,
    /// Ids of timers to delete
    pub delete_timer_infos: Vec<String>,
    /// Child runs to upsert
    pub upsert_child_execution_infos: Vec<ChildExecutionInfo>,
    /// Initiated ids of child runs to delete
    pub delete_child_execution_infos: Vec<i64>,
    /// Cancel requests to upsert
    pub upsert_request_cancel_infos: Vec<RequestCancelInfo>,
    /// Initiated ids of cancel requests to delete
    pub delete_request_cancel_infos: Vec<i64>,
    /// Signals to upsert
    pub upsert_signal_infos: Vec<SignalInfo>,
    /// Initiated ids of signals to delete
    pub delete_signal_infos: Vec<i64>,
    /// Signal request ids to record
    pub upsert_signal_requested_ids: Vec<String>,
    /// Signal request ids to forget
    pub delete_signal_requested_ids: Vec<String>,
    /// Drop every buffered event batch
    pub clear_buffered_events: bool,
    /// Batch to append, after any clear
    pub new_buffered_events: Option<DataBlob>,
    /// Queue entries
    pub tasks: Tasks,
    /// `next_event_id` the stored run must have
    pub condition: i64,
}

impl WorkflowMutation {
    /// Mutation that only rewrites the scalar state
    pub fn new(
        execution_info: WorkflowExecutionInfo,
        replication: ReplicationMode,
        condition: i64,
    ) -> Self {
        Self {
            execution_info,
            replication,
            upsert_activity_infos: Vec::new(),
            delete_activity_infos: Vec::new(),
            upsert_timer_infos: Vec::new(),
            delete_timer_infos: Vec::new(),
            upsert_child_execution_infos: Vec::new(),
            delete_child_execution_infos: Vec::new(),
            upsert_request_cancel_infos: Vec::new(),
            delete_request_cancel_infos: Vec::new(),
            upsert_signal_infos: Vec::new(),
            delete_signal_infos: Vec::new(),
            upsert_signal_requested_ids: Vec::new(),
            delete_signal_requested_ids: Vec::new(),
            clear_buffered_events: false,
            new_buffered_events: None,
            tasks: Tasks::none(),
            condition,
        }
    }
}

/// Create a run
#[derive(Debug, Clone, PartialEq)]
pub struct CreateWorkflowExecutionRequest {
    /// Shard token held by the caller
    pub range_id: i64,
    /// Relation to the current pointer
    pub mode: CreateWorkflowMode,
    /// The new run
    pub new_workflow: WorkflowSnapshot,
}

/// Mutate a run, optionally starting its successor in the same batch
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateWorkflowExecutionRequest {
    /// Shard token held by the caller
    pub range_id: i64,
    /// Change to the run
    pub mutation: WorkflowMutation,
    /// Run continuing the mutated one; it takes over the current pointer
    pub new_workflow: Option<WorkflowSnapshot>,
}

/// What a reset does to the run that is current when it forks
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentRunAction {
    /// Apply a mutation to the current run
    Update(WorkflowMutation),
    /// Only check the current run is unchanged
    AssertUnchanged {
        /// Current run
        run_id: RunId,
        /// `next_event_id` it must still have
        condition: i64,
    },
}

impl CurrentRunAction {
    /// Current run and its `next_event_id` gate
    pub fn run_and_condition(&self) -> (RunId, i64) {
        match self {
            CurrentRunAction::Update(mutation) => {
                (mutation.execution_info.run_id, mutation.condition)
            }
            CurrentRunAction::AssertUnchanged { run_id, condition } => (*run_id, *condition),
        }
    }
}

/// Extra predicates on the current pointer for runs that track replication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentRunGuard {
    /// Last write version the pointer must carry
    pub last_write_version: i64,
    /// State the pointer must carry
    pub state: WorkflowState,
}

/// Fork a new run from `base_run_id` and make it current
#[derive(Debug, Clone, PartialEq)]
pub struct ResetWorkflowExecutionRequest {
    /// Shard token held by the caller
    pub range_id: i64,
    /// Run the new one forks from
    pub base_run_id: RunId,
    /// `next_event_id` the base run must still have, when it is not current
    pub base_run_next_event_id: i64,
    /// What happens to the current run
    pub current: CurrentRunAction,
    /// Version and state predicates on the pointer
    pub current_run_guard: Option<CurrentRunGuard>,
    /// The new run
    pub new_workflow: WorkflowSnapshot,
}

/// Replace a run's state wholesale and repoint the current pointer at it
#[derive(Debug, Clone, PartialEq)]
pub struct ResetMutableStateRequest {
    /// Shard token held by the caller
    pub range_id: i64,
    /// Run the pointer must name
    pub previous_run_id: RunId,
    /// Last write version the pointer must carry
    pub previous_last_write_version: i64,
    /// State the pointer must carry
    pub previous_state: WorkflowState,
    /// The replacement state; `condition` gates the stored run
    pub snapshot: WorkflowSnapshot,
}
