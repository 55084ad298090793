//! Shard store
//!
//! One row per shard, in the shard's own partition next to the runs and
//! queues it owns. The row's `range_id` is the shard lease: ownership moves
//! by a conditional update from the old token to a new one.

use crate::codec::{decode_shard, shard_assignments, to_doc};
use crate::config::PersistenceConfig;
use crate::errors::{read_error, write_error};
use fencepost_concurrency::Fence;
use fencepost_core::records::ShardRecord;
use fencepost_core::schema::{columns, EXECUTIONS_TABLE};
use fencepost_core::{PersistenceError, Result, SchemaConstants};
use fencepost_storage::{Assignment, Statement, WideColumnStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// Create, read and re-lease shard records
pub struct ShardStore {
    backend: Arc<dyn WideColumnStore>,
    schema: Arc<SchemaConstants>,
    config: Arc<PersistenceConfig>,
}

impl ShardStore {
    /// Create a store over `backend`
    pub fn new(
        backend: Arc<dyn WideColumnStore>,
        schema: Arc<SchemaConstants>,
        config: Arc<PersistenceConfig>,
    ) -> Self {
        Self {
            backend,
            schema,
            config,
        }
    }

    /// Insert the record of a shard that has never been owned
    ///
    /// # Errors
    ///
    /// `ShardAlreadyExists` with the owner and token of the row that blocked
    /// the insert.
    pub fn create_shard(&self, record: &ShardRecord) -> Result<()> {
        let statement = Statement::insert(
            EXECUTIONS_TABLE,
            self.schema.shard_partition(record.shard_id),
            self.schema.shard_row_key(),
        )
        .assign_all(shard_assignments(record)?)
        .if_not_exists();

        let outcome = self
            .backend
            .execute(statement)
            .map_err(|e| write_error("CreateShard", e))?;
        if outcome.applied {
            debug!(shard_id = record.shard_id, range_id = record.range_id, "shard created");
            return Ok(());
        }

        let existing = outcome
            .rows
            .first()
            .ok_or_else(|| {
                PersistenceError::internal(format!(
                    "CreateShard rejected without the blocking row, shard {}",
                    record.shard_id
                ))
            })
            .and_then(decode_shard)?;
        Err(PersistenceError::ShardAlreadyExists {
            shard_id: record.shard_id,
            owner: existing.owner,
            range_id: existing.range_id,
        })
    }

    /// Read a shard record
    ///
    /// Per-cluster ack levels missing for the current cluster are filled
    /// from the scalar levels.
    pub fn get_shard(&self, shard_id: i32) -> Result<ShardRecord> {
        let row = self
            .backend
            .read(
                EXECUTIONS_TABLE,
                &self.schema.shard_partition(shard_id),
                &self.schema.shard_row_key(),
            )
            .map_err(|e| read_error("GetShard", e))?
            .ok_or_else(|| PersistenceError::not_found(format!("shard {} not found", shard_id)))?;
        let mut record = decode_shard(&row)?;
        record.backfill_cluster_ack_levels(&self.config.current_cluster_name);
        Ok(record)
    }

    /// Overwrite a shard record, moving its token from `previous_range_id`
    /// to `record.range_id`
    ///
    /// # Errors
    ///
    /// `ShardOwnershipLost` when the stored token is no longer
    /// `previous_range_id`. The caller must stop writing under the old
    /// lease.
    pub fn update_shard(&self, record: &ShardRecord, previous_range_id: i64) -> Result<()> {
        let fence = Fence::shard(&self.schema, record.shard_id, previous_range_id);
        let statement = fence
            .advance_to(record.range_id)
            .assign(Assignment::Set(columns::SHARD, to_doc(record)?));

        let outcome = self
            .backend
            .execute(statement)
            .map_err(|e| write_error("UpdateShard", e))?;
        if outcome.applied {
            return Ok(());
        }

        let observed = fence.find_break(&outcome.rows).and_then(|b| b.observed);
        warn!(
            shard_id = record.shard_id,
            previous_range_id,
            ?observed,
            "shard lease lost"
        );
        Err(PersistenceError::ShardOwnershipLost {
            shard_id: record.shard_id,
            message: format!(
                "failed to update shard, previous range id {}, stored range id {:?}",
                previous_range_id, observed
            ),
        })
    }
}

impl std::fmt::Debug for ShardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardStore")
            .field("cluster", &self.config.current_cluster_name)
            .finish()
    }
}
