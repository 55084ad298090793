//! Core types for fencepost
//!
//! This crate defines the vocabulary shared by every other crate:
//! - Identifiers ([`DomainId`], [`RunId`], [`WorkflowExecution`])
//! - The wide-column value model ([`Cell`], [`KeyPart`], [`Row`])
//! - Entity records for shards, executions, queues and task lists
//! - The persisted schema contract ([`SchemaConstants`])
//! - The error taxonomy ([`PersistenceError`])

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blob;
pub mod error;
pub mod records;
pub mod schema;
pub mod types;
pub mod value;

pub use blob::{DataBlob, EncodingType};
pub use error::{PersistenceError, Result};
pub use schema::SchemaConstants;
pub use types::{DomainId, RunId, WorkflowExecution};
pub use value::{Cell, ClusteringKey, KeyPart, PartitionKey, Row};

/// Version used when a run carries no replication information.
pub const EMPTY_VERSION: i64 = -24;

/// Event id of the first event in every workflow history.
pub const FIRST_EVENT_ID: i64 = 1;

/// Event id placeholder for "no event".
pub const EMPTY_EVENT_ID: i64 = -23;
