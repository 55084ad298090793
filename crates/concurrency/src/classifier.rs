//! Conditional-failure classification
//!
//! A rejected batch only says "not applied". The store also returns the
//! existing rows its conditions were evaluated against, and this module
//! works out from those rows which condition actually failed.
//!
//! ## Priority
//!
//! All returned rows are scanned first and the first mismatch of each kind
//! is recorded. The decision is then made in a fixed order:
//!
//! 1. shard token moved → [`Conflict::ShardOwnershipLost`]
//! 2. current pointer names another run → [`Conflict::CurrentRunMismatch`]
//! 3. target run's `next_event_id` moved → [`Conflict::NextEventIdMismatch`]
//! 4. otherwise → [`Conflict::Unexplained`] with every returned column
//!
//! The create path differs in step 2: a current pointer that exists where
//! none was expected, or that matched the expected run but failed the
//! reuse guard, is [`Conflict::AlreadyStarted`].

use crate::fencing::{BrokenFence, Fence};
use fencepost_core::schema::{columns, RowType};
use fencepost_core::{KeyPart, Row, RunId, SchemaConstants};
use tracing::debug;
use uuid::Uuid;

/// Why a conditional batch was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum Conflict<'a> {
    /// The shard's fencing token moved
    ShardOwnershipLost(BrokenFence),
    /// The current pointer names a different run
    CurrentRunMismatch {
        /// Run the caller assumed current
        expected: RunId,
        /// Run found in the pointer
        observed: Option<Uuid>,
    },
    /// A current pointer blocks the create
    AlreadyStarted {
        /// The blocking pointer row
        current_row: &'a Row,
    },
    /// The target run's optimistic lock moved
    NextEventIdMismatch {
        /// Target run
        run_id: RunId,
        /// Condition the caller supplied
        expected: i64,
        /// Value found in the row
        observed: Option<i64>,
    },
    /// No known condition explains the rejection
    Unexplained {
        /// Every returned column, as `row: name=value`
        columns: String,
    },
}

/// What an update or reset batch conditioned on
#[derive(Debug, Clone)]
pub struct Expectations {
    /// Shard fence of the batch
    pub shard: Fence,
    /// Run the current pointer must name, if the batch repoints it
    pub current_run_id: Option<RunId>,
    /// Runs whose `next_event_id` the batch gates on, with the condition
    pub runs: Vec<(RunId, i64)>,
}

/// What a create batch conditioned on
#[derive(Debug, Clone)]
pub struct CreateExpectations {
    /// Shard fence of the batch
    pub shard: Fence,
    /// Previous run the pointer must name; `None` for a brand-new workflow
    pub previous_run_id: Option<RunId>,
}

fn is_run_row(schema: &SchemaConstants, row: &Row, run_id: RunId) -> bool {
    schema.row_type_of(&row.key) == Some(RowType::Execution)
        && row.key.part(3) == Some(&KeyPart::Uuid(run_id.as_uuid()))
}

/// Render every returned column for diagnostics
pub fn render_columns(rows: &[Row]) -> String {
    let mut rendered = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        rendered.push(format!("{}: key={}", i, row.key));
        for (name, cell) in &row.columns {
            rendered.push(format!("{}: {}={}", i, name, cell));
        }
    }
    rendered.join(",")
}

/// Classify a rejected update or reset batch
///
/// # Arguments
///
/// * `schema` - Layout constants, to recognize row types
/// * `rows` - Rows returned with the rejection
/// * `expected` - What the batch conditioned on
///
/// # Returns
///
/// The highest-priority mismatch found among all rows
pub fn classify<'a>(schema: &SchemaConstants, rows: &'a [Row], expected: &Expectations) -> Conflict<'a> {
    let mut shard_break = None;
    let mut current_mismatch = None;
    let mut next_event_mismatch = None;

    for row in rows {
        if shard_break.is_none() {
            shard_break = expected.shard.check(row);
        }
        if schema.is_current_row(&row.key) {
            if let Some(run_id) = expected.current_run_id {
                let observed = row.uuid(columns::CURRENT_RUN_ID);
                if current_mismatch.is_none() && observed != Some(run_id.as_uuid()) {
                    current_mismatch = Some(Conflict::CurrentRunMismatch {
                        expected: run_id,
                        observed,
                    });
                }
            }
            continue;
        }
        for (run_id, condition) in &expected.runs {
            if !is_run_row(schema, row, *run_id) {
                continue;
            }
            let observed = row.int(columns::NEXT_EVENT_ID);
            if next_event_mismatch.is_none() && observed != Some(*condition) {
                next_event_mismatch = Some(Conflict::NextEventIdMismatch {
                    run_id: *run_id,
                    expected: *condition,
                    observed,
                });
            }
        }
    }

    let conflict = if let Some(broken) = shard_break {
        Conflict::ShardOwnershipLost(broken)
    } else if let Some(mismatch) = current_mismatch {
        mismatch
    } else if let Some(mismatch) = next_event_mismatch {
        mismatch
    } else {
        Conflict::Unexplained {
            columns: render_columns(rows),
        }
    };
    debug!(rows = rows.len(), ?conflict, "classified rejected batch");
    conflict
}

/// Classify a rejected create batch
///
/// # Arguments
///
/// * `schema` - Layout constants, to recognize row types
/// * `rows` - Rows returned with the rejection
/// * `expected` - What the batch conditioned on
pub fn classify_create<'a>(
    schema: &SchemaConstants,
    rows: &'a [Row],
    expected: &CreateExpectations,
) -> Conflict<'a> {
    let mut shard_break = None;
    let mut current_row = None;

    for row in rows {
        if shard_break.is_none() {
            shard_break = expected.shard.check(row);
        }
        if current_row.is_none() && schema.is_current_row(&row.key) {
            current_row = Some(row);
        }
    }

    let conflict = match (shard_break, current_row) {
        (Some(broken), _) => Conflict::ShardOwnershipLost(broken),
        (None, Some(row)) => match expected.previous_run_id {
            None => Conflict::AlreadyStarted { current_row: row },
            Some(previous) => {
                let observed = row.uuid(columns::CURRENT_RUN_ID);
                if observed != Some(previous.as_uuid()) {
                    Conflict::CurrentRunMismatch {
                        expected: previous,
                        observed,
                    }
                } else {
                    // The pointer names the expected run but the reuse
                    // guard (version, state) failed
                    Conflict::AlreadyStarted { current_row: row }
                }
            }
        },
        (None, None) => Conflict::Unexplained {
            columns: render_columns(rows),
        },
    };
    debug!(rows = rows.len(), ?conflict, "classified rejected create");
    conflict
}
