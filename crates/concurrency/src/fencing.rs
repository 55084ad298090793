//! Fencing-token leases
//!
//! A partition owned under a lease (a shard, a task list) has one row that
//! holds the lease token in its `range_id` column. The owner appends a
//! [`Fence`] statement to every batch it writes: `SET range_id = t IF
//! range_id = t`. If another owner has taken the lease the token has moved,
//! the whole batch is rejected, and the store hands the token row back so
//! the loss can be recognized.
//!
//! ## Token Rules
//!
//! | Operation | Statement |
//! |-----------|-----------|
//! | first lease | insert with the initial token `IF NOT EXISTS` |
//! | steal / renew | `SET range_id = t + 1 IF range_id = t` |
//! | write under lease | `SET range_id = t IF range_id = t` |

use fencepost_core::schema::{columns, EXECUTIONS_TABLE, TASKS_TABLE};
use fencepost_core::value::ColumnName;
use fencepost_core::{ClusteringKey, DomainId, PartitionKey, Row, SchemaConstants};
use fencepost_storage::Statement;

/// A token check on the lease row of a partition
#[derive(Debug, Clone, PartialEq)]
pub struct Fence {
    table: &'static str,
    partition: PartitionKey,
    key: ClusteringKey,
    column: ColumnName,
    expected: i64,
}

/// A fence the store reported as broken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokenFence {
    /// Token the writer held
    pub expected: i64,
    /// Token found in the row; `None` if the column was null
    pub observed: Option<i64>,
}

impl Fence {
    /// Fence on an arbitrary token row
    pub fn new(
        table: &'static str,
        partition: PartitionKey,
        key: ClusteringKey,
        column: ColumnName,
        expected: i64,
    ) -> Self {
        Self {
            table,
            partition,
            key,
            column,
            expected,
        }
    }

    /// Fence on the shard row of `shard_id`
    pub fn shard(schema: &SchemaConstants, shard_id: i32, range_id: i64) -> Self {
        Self::new(
            EXECUTIONS_TABLE,
            schema.shard_partition(shard_id),
            schema.shard_row_key(),
            columns::RANGE_ID,
            range_id,
        )
    }

    /// Fence on the header row of a task list
    pub fn task_list(
        schema: &SchemaConstants,
        domain_id: DomainId,
        name: &str,
        task_type: i64,
        range_id: i64,
    ) -> Self {
        Self::new(
            TASKS_TABLE,
            schema.task_list_partition(domain_id, name, task_type),
            schema.task_list_row_key(),
            columns::RANGE_ID,
            range_id,
        )
    }

    /// Token the writer holds
    pub fn expected(&self) -> i64 {
        self.expected
    }

    /// Key of the token row
    pub fn key(&self) -> &ClusteringKey {
        &self.key
    }

    /// The assert-unchanged statement to append to a batch
    pub fn statement(&self) -> Statement {
        Statement::update(self.table, self.partition.clone(), self.key.clone())
            .set(self.column, self.expected)
            .if_eq(self.column, self.expected)
    }

    /// The statement that moves the lease from the held token to `next`
    pub fn advance_to(&self, next: i64) -> Statement {
        Statement::update(self.table, self.partition.clone(), self.key.clone())
            .set(self.column, next)
            .if_eq(self.column, self.expected)
    }

    /// Check a returned row against the fence
    ///
    /// Returns `None` when `row` is not the token row or still carries the
    /// expected token.
    pub fn check(&self, row: &Row) -> Option<BrokenFence> {
        if row.key != self.key {
            return None;
        }
        let observed = row.int(self.column);
        if observed == Some(self.expected) {
            return None;
        }
        Some(BrokenFence {
            expected: self.expected,
            observed,
        })
    }

    /// First broken check among `rows`
    pub fn find_break(&self, rows: &[Row]) -> Option<BrokenFence> {
        rows.iter().find_map(|row| self.check(row))
    }
}
