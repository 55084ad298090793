//! Persistence error taxonomy
//!
//! Every operation of every store returns one of these kinds. Backend
//! failures are classified where the call is made and never leak out raw.
//!
//! ## Caller Contract
//!
//! | Kind | What the caller does |
//! |------|----------------------|
//! | `EntityNotFound` | decides; nothing was read |
//! | `ShardOwnershipLost` | stops writing under the stale lease, re-acquires |
//! | `ConditionFailed` | re-reads and retries with fresh state |
//! | `CurrentWorkflowConditionFailed` | re-resolves which run is current |
//! | `WorkflowExecutionAlreadyStarted` | reports a start conflict (idempotent start) |
//! | `ShardAlreadyExists` | reads the existing shard |
//! | `Busy` | retries (safe) |
//! | `AmbiguousOutcome` | re-reads before anything else; never retries blindly |
//! | `Internal` | gives up; bug or schema drift |

use crate::records::{CloseStatus, WorkflowState};
use crate::types::RunId;
use thiserror::Error;

/// All persistence errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PersistenceError {
    /// Point read found nothing
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    /// Shard fencing token no longer matches
    #[error("shard {shard_id} ownership lost: {message}")]
    ShardOwnershipLost {
        /// Shard whose lease was lost
        shard_id: i32,
        /// Observed vs expected token, for diagnostics
        message: String,
    },

    /// Generic optimistic-concurrency violation
    #[error("condition failed: {0}")]
    ConditionFailed(String),

    /// The current run of a workflow id is not the one the caller assumed
    #[error("current workflow condition failed: {0}")]
    CurrentWorkflowConditionFailed(String),

    /// A run of this workflow id is already current
    #[error(
        "workflow execution already started: run {run_id}, request {create_request_id}, \
         state {state:?}, close status {close_status:?}, last write version {last_write_version}"
    )]
    WorkflowExecutionAlreadyStarted {
        /// Current run
        run_id: RunId,
        /// Request id that created the current run
        create_request_id: String,
        /// State of the current run
        state: WorkflowState,
        /// Close status of the current run
        close_status: CloseStatus,
        /// Last write version of the current run
        last_write_version: i64,
    },

    /// Duplicate shard create
    #[error("shard {shard_id} already exists: owner {owner:?}, range id {range_id}")]
    ShardAlreadyExists {
        /// Shard id
        shard_id: i32,
        /// Owner recorded in the blocking row
        owner: String,
        /// Range id recorded in the blocking row
        range_id: i64,
    },

    /// Transient overload signaled by the backend
    #[error("busy: {0}")]
    Busy(String),

    /// A write may or may not have been applied
    #[error("ambiguous outcome: {0}")]
    AmbiguousOutcome(String),

    /// Unexpected backend shape, invalid request, or bug
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;

impl PersistenceError {
    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        PersistenceError::Internal(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        PersistenceError::EntityNotFound(msg.into())
    }

    /// Create a condition-failed error
    pub fn condition_failed(msg: impl Into<String>) -> Self {
        PersistenceError::ConditionFailed(msg.into())
    }

    /// Check if a generic retry wrapper may retry this error.
    ///
    /// Only `Busy` and `AmbiguousOutcome` qualify; `AmbiguousOutcome`
    /// still requires a re-read before the retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PersistenceError::Busy(_) | PersistenceError::AmbiguousOutcome(_)
        )
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PersistenceError::EntityNotFound(_))
    }

    /// Check if this is a concurrency conflict of any kind.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            PersistenceError::ConditionFailed(_)
                | PersistenceError::CurrentWorkflowConditionFailed(_)
                | PersistenceError::WorkflowExecutionAlreadyStarted { .. }
                | PersistenceError::ShardAlreadyExists { .. }
        )
    }

    /// Check if this error means the caller's lease is gone.
    pub fn is_ownership_lost(&self) -> bool {
        matches!(self, PersistenceError::ShardOwnershipLost { .. })
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_serious(&self) -> bool {
        matches!(self, PersistenceError::Internal(_))
    }
}

// Decoding failures of stored documents are schema drift
impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Internal(format!("malformed stored document: {}", e))
    }
}
