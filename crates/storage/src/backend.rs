//! Backing-store contract
//!
//! The persistence engine needs exactly five things from a wide-column store:
//! point reads, paged range reads, single-statement writes, single-partition
//! atomic batches with lightweight-transaction conditions, and range deletes.
//!
//! Implementations must be safe for concurrent use; the engine issues calls
//! from many threads against one shared handle.

use crate::statement::{Batch, CasOutcome, KeyRange, Page, RangeQuery, Statement};
use fencepost_core::{ClusteringKey, PartitionKey, Row};
use thiserror::Error;

/// Failures reported by a backing store
///
/// These never reach callers of the engine; they are mapped to
/// persistence errors where the call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The request was sent but no answer arrived in time
    #[error("timeout: {0}")]
    Timeout(String),

    /// The store shed load
    #[error("throttled: {0}")]
    Throttled(String),

    /// Not enough replicas to serve the request
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the request shape
    #[error("invalid statement: {0}")]
    InvalidStatement(String),
}

impl BackendError {
    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Timeout(_))
    }

    /// Check if this is throttling
    pub fn is_throttled(&self) -> bool {
        matches!(self, BackendError::Throttled(_))
    }
}

/// Result type for backend calls
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// A partition-oriented store with single-partition compare-and-swap
pub trait WideColumnStore: Send + Sync {
    /// Point read; `None` when the row is absent or expired
    fn read(
        &self,
        table: &'static str,
        partition: &PartitionKey,
        key: &ClusteringKey,
    ) -> BackendResult<Option<Row>>;

    /// One page of a range read, in clustering order
    fn scan(&self, query: &RangeQuery) -> BackendResult<Page>;

    /// Single statement, optionally conditional
    fn execute(&self, statement: Statement) -> BackendResult<CasOutcome>;

    /// Atomic batch; every statement must target the same partition
    ///
    /// Either all statements are applied or none. When any condition fails
    /// the outcome carries the existing rows targeted by the conditional
    /// statements.
    fn batch(&self, batch: Batch) -> BackendResult<CasOutcome>;

    /// Remove every row in `range`; absent rows are ignored
    fn delete_range(&self, range: &KeyRange) -> BackendResult<()>;
}
