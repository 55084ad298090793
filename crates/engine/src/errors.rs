//! Backend error mapping
//!
//! Every backend call goes through one of these two functions, so a raw
//! [`BackendError`] never leaves the engine.
//!
//! | Backend error | Read | Write |
//! |---------------|------|-------|
//! | `Timeout` | `Busy` | `AmbiguousOutcome` |
//! | `Throttled` | `Busy` | `Busy` |
//! | `Unavailable` | `Internal` | `Internal` |
//! | `InvalidStatement` | `Internal` | `Internal` |
//!
//! A write that timed out may still have been applied, so the caller has to
//! re-read before doing anything else. Reads change nothing and are safe to
//! retry.

use fencepost_core::PersistenceError;
use fencepost_storage::BackendError;
use tracing::warn;

/// Map a failed read
pub(crate) fn read_error(operation: &str, err: BackendError) -> PersistenceError {
    match err {
        BackendError::Timeout(_) | BackendError::Throttled(_) => {
            PersistenceError::Busy(format!("{} operation failed: {}", operation, err))
        }
        other => PersistenceError::Internal(format!("{} operation failed: {}", operation, other)),
    }
}

/// Map a failed write
pub(crate) fn write_error(operation: &str, err: BackendError) -> PersistenceError {
    match err {
        BackendError::Timeout(_) => {
            warn!(operation, error = %err, "write outcome unknown");
            PersistenceError::AmbiguousOutcome(format!("{} operation timed out: {}", operation, err))
        }
        BackendError::Throttled(_) => {
            PersistenceError::Busy(format!("{} operation failed: {}", operation, err))
        }
        other => PersistenceError::Internal(format!("{} operation failed: {}", operation, other)),
    }
}
