//! Identifier types
//!
//! This module defines the identifiers used throughout the system:
//! - [`DomainId`]: Tenant-level namespace for workflows
//! - [`RunId`]: One execution attempt of a workflow id
//! - [`WorkflowExecution`]: The `(workflow_id, run_id)` pair

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DomainId(Uuid);

impl DomainId {
    /// Create a new random DomainId using UUID v4
    pub fn new() -> Self {
        DomainId(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub const fn from_uuid(uuid: Uuid) -> Self {
        DomainId(uuid)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DomainId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DomainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a workflow run
///
/// A workflow id may have many runs over its lifetime (continue-as-new,
/// id reuse, resets); exactly one of them is current at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId using UUID v4
    ///
    /// # Examples
    ///
    /// ```
    /// use fencepost_core::types::RunId;
    ///
    /// let id1 = RunId::new();
    /// let id2 = RunId::new();
    /// assert_ne!(id1, id2);
    /// ```
    pub fn new() -> Self {
        RunId(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub const fn from_uuid(uuid: Uuid) -> Self {
        RunId(uuid)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A workflow id together with one of its runs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// Caller-chosen workflow id
    pub workflow_id: String,
    /// Run of that workflow id
    pub run_id: RunId,
}

impl WorkflowExecution {
    /// Create a new execution identity
    pub fn new(workflow_id: impl Into<String>, run_id: RunId) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id,
        }
    }
}

impl std::fmt::Display for WorkflowExecution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.workflow_id, self.run_id)
    }
}
