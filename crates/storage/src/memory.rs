//! In-process wide-column store
//!
//! `MemoryStore` implements [`WideColumnStore`] with the guarantees the
//! engine relies on and nothing more: atomicity and compare-and-swap within
//! one partition, row TTLs, and cursor pagination.
//!
//! # Design
//!
//! - DashMap keyed by `(table, partition)`: different partitions never
//!   contend
//! - One mutex per partition: a batch holds it for evaluation and apply,
//!   which is exactly the single-partition LWT guarantee
//! - BTreeMap of rows inside a partition: clustering order for free
//! - Expired rows read as absent and are purged on the next write
//!
//! # Fault Injection
//!
//! Tests queue [`Fault`]s that the next calls consume in order. A timeout
//! can be injected with or without the write having been applied, which is
//! the ambiguity the engine must surface to its callers.

use crate::backend::{BackendError, BackendResult, WideColumnStore};
use crate::clock::{Clock, SystemClock};
use crate::statement::{
    Assignment, Batch, CasOutcome, Condition, KeyRange, Operation, Page, RangeQuery, Statement,
};
use dashmap::DashMap;
use fencepost_core::value::ColumnName;
use fencepost_core::{Cell, ClusteringKey, PartitionKey, Row};
use parking_lot::Mutex;
use rustc_hash::FxHasher;
use std::collections::{BTreeMap, VecDeque};
use std::hash::BuildHasherDefault;
use std::ops::Bound;
use std::sync::Arc;
use tracing::debug;

type PartitionId = (&'static str, PartitionKey);

/// A failure the next call will report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Time out; for writes, `applied` says whether the write went through
    Timeout {
        /// Whether the write is applied before the timeout is reported
        applied: bool,
    },
    /// Reject with throttling before doing anything
    Throttled,
    /// Reject as unavailable before doing anything
    Unavailable,
}

#[derive(Debug, Clone)]
struct StoredRow {
    columns: BTreeMap<ColumnName, Cell>,
    expires_at_ms: Option<i64>,
}

impl StoredRow {
    fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at_ms.map_or(true, |at| at > now_ms)
    }

    fn to_row(&self, key: &ClusteringKey) -> Row {
        Row {
            key: key.clone(),
            columns: self.columns.clone(),
        }
    }
}

/// Rows of one partition in clustering order
#[derive(Debug, Default)]
struct Partition {
    rows: BTreeMap<ClusteringKey, StoredRow>,
}

impl Partition {
    fn live(&self, key: &ClusteringKey, now_ms: i64) -> Option<&StoredRow> {
        self.rows.get(key).filter(|r| r.is_live(now_ms))
    }

    fn purge_expired(&mut self, now_ms: i64) {
        self.rows.retain(|_, r| r.is_live(now_ms));
    }
}

/// In-process partitioned store with lightweight transactions
///
/// # Thread Safety
///
/// All operations are thread-safe:
/// - Reads and writes of one partition serialize on its mutex
/// - Different partitions never contend
///
/// # Example
///
/// ```
/// use fencepost_storage::{MemoryStore, Statement, WideColumnStore};
/// use fencepost_core::{ClusteringKey, KeyPart, PartitionKey};
///
/// let store = MemoryStore::new();
/// let pk = PartitionKey::new(vec![KeyPart::Int(1)]);
/// let key = ClusteringKey::new(vec![KeyPart::Int(0)]);
/// let stmt = Statement::insert("t", pk.clone(), key.clone())
///     .set("range_id", 1i64)
///     .if_not_exists();
/// assert!(store.execute(stmt.clone()).unwrap().applied);
/// assert!(!store.execute(stmt).unwrap().applied);
/// ```
pub struct MemoryStore {
    partitions: DashMap<PartitionId, Arc<Mutex<Partition>>, BuildHasherDefault<FxHasher>>,
    clock: Arc<dyn Clock>,
    faults: Mutex<VecDeque<Fault>>,
}

impl MemoryStore {
    /// Store using the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store using `clock` for row expiry
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            partitions: DashMap::with_hasher(BuildHasherDefault::default()),
            clock,
            faults: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue a fault for the next call
    pub fn inject_fault(&self, fault: Fault) {
        self.faults.lock().push_back(fault);
    }

    /// Number of partitions ever written
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Number of live rows in a partition
    pub fn live_row_count(&self, table: &'static str, partition: &PartitionKey) -> usize {
        let now = self.clock.now_ms();
        match self.existing(table, partition) {
            Some(p) => {
                let guard = p.lock();
                guard.rows.values().filter(|r| r.is_live(now)).count()
            }
            None => 0,
        }
    }

    fn take_fault(&self) -> Option<Fault> {
        let fault = self.faults.lock().pop_front();
        if let Some(fault) = fault {
            debug!(?fault, "injecting backend fault");
        }
        fault
    }

    fn existing(&self, table: &'static str, partition: &PartitionKey) -> Option<Arc<Mutex<Partition>>> {
        self.partitions
            .get(&(table, partition.clone()))
            .map(|entry| Arc::clone(entry.value()))
    }

    fn partition(&self, table: &'static str, partition: &PartitionKey) -> Arc<Mutex<Partition>> {
        if let Some(existing) = self.existing(table, partition) {
            return existing;
        }
        let entry = self
            .partitions
            .entry((table, partition.clone()))
            .or_default();
        Arc::clone(entry.value())
    }

    /// Fail a read according to `fault`
    fn read_fault(fault: Option<Fault>) -> BackendResult<()> {
        match fault {
            None => Ok(()),
            Some(Fault::Timeout { .. }) => Err(BackendError::Timeout("read timed out".into())),
            Some(Fault::Throttled) => Err(BackendError::Throttled("read throttled".into())),
            Some(Fault::Unavailable) => Err(BackendError::Unavailable("read unavailable".into())),
        }
    }

    fn apply_statements(&self, statements: Vec<Statement>) -> BackendResult<CasOutcome> {
        let first = statements
            .first()
            .ok_or_else(|| BackendError::InvalidStatement("empty batch".into()))?;
        let (table, partition_key) = (first.table, first.partition.clone());
        for stmt in &statements {
            if stmt.table != table || stmt.partition != partition_key {
                return Err(BackendError::InvalidStatement(format!(
                    "batch spans partitions: {}{} and {}{}",
                    table, partition_key, stmt.table, stmt.partition
                )));
            }
            if stmt.op == Operation::Delete && !stmt.assignments.is_empty() {
                return Err(BackendError::InvalidStatement(format!(
                    "delete with assignments: {}",
                    stmt
                )));
            }
            if let Condition::If(predicates) = &stmt.condition {
                if predicates.is_empty() {
                    return Err(BackendError::InvalidStatement(format!(
                        "empty condition: {}",
                        stmt
                    )));
                }
            }
        }

        let fault = self.take_fault();
        match fault {
            Some(Fault::Throttled) => {
                return Err(BackendError::Throttled("write throttled".into()))
            }
            Some(Fault::Unavailable) => {
                return Err(BackendError::Unavailable("write unavailable".into()))
            }
            Some(Fault::Timeout { applied: false }) => {
                return Err(BackendError::Timeout("write timed out".into()))
            }
            _ => {}
        }

        let partition = self.partition(table, &partition_key);
        let mut partition = partition.lock();
        let now = self.clock.now_ms();
        partition.purge_expired(now);

        // Conditions see the partition as it was before the batch
        let mut holds = true;
        let mut blocking: BTreeMap<ClusteringKey, Row> = BTreeMap::new();
        for stmt in statements.iter().filter(|s| s.is_conditional()) {
            let existing = partition.live(&stmt.key, now);
            if !condition_holds(&stmt.condition, existing) {
                holds = false;
            }
            if let Some(row) = existing {
                blocking
                    .entry(stmt.key.clone())
                    .or_insert_with(|| row.to_row(&stmt.key));
            }
        }

        let outcome = if holds {
            for stmt in statements {
                apply_statement(&mut partition, stmt, now);
            }
            CasOutcome::applied()
        } else {
            CasOutcome::rejected(blocking.into_values().collect())
        };

        if let Some(Fault::Timeout { applied: true }) = fault {
            return Err(BackendError::Timeout("write timed out after apply".into()));
        }
        Ok(outcome)
    }
}

fn condition_holds(condition: &Condition, existing: Option<&StoredRow>) -> bool {
    match (condition, existing) {
        (Condition::None, _) => true,
        (Condition::IfNotExists, existing) => existing.is_none(),
        (Condition::If(_), None) => false,
        (Condition::If(predicates), Some(row)) => predicates
            .iter()
            .all(|p| row.columns.get(p.column) == Some(&p.expected)),
    }
}

fn is_empty_collection(cell: &Cell) -> bool {
    match cell {
        Cell::Map(m) => m.is_empty(),
        Cell::Set(s) => s.is_empty(),
        Cell::List(l) => l.is_empty(),
        _ => false,
    }
}

fn apply_statement(partition: &mut Partition, stmt: Statement, now_ms: i64) {
    if stmt.op == Operation::Delete {
        partition.rows.remove(&stmt.key);
        return;
    }

    let row = partition
        .rows
        .entry(stmt.key)
        .or_insert_with(|| StoredRow {
            columns: BTreeMap::new(),
            expires_at_ms: None,
        });

    let expiry = stmt
        .ttl_secs
        .filter(|secs| *secs > 0)
        .map(|secs| now_ms + secs * 1_000);
    match stmt.op {
        Operation::Insert => row.expires_at_ms = expiry,
        _ if stmt.ttl_secs.is_some() => row.expires_at_ms = expiry,
        _ => {}
    }

    for assignment in stmt.assignments {
        apply_assignment(&mut row.columns, assignment);
    }
}

fn apply_assignment(columns: &mut BTreeMap<ColumnName, Cell>, assignment: Assignment) {
    let column = assignment.column();
    match assignment {
        Assignment::Set(_, cell) => {
            columns.insert(column, cell);
        }
        Assignment::Remove(_) => {
            columns.remove(column);
        }
        Assignment::PutMapEntry(_, key, value) => {
            match columns.get_mut(column) {
                Some(Cell::Map(map)) => {
                    map.insert(key, value);
                }
                _ => {
                    columns.insert(column, Cell::Map(BTreeMap::from([(key, value)])));
                }
            }
        }
        Assignment::RemoveMapEntry(_, key) => {
            if let Some(Cell::Map(map)) = columns.get_mut(column) {
                map.remove(&key);
            }
        }
        Assignment::AppendList(_, values) => match columns.get_mut(column) {
            Some(Cell::List(list)) => list.extend(values),
            _ => {
                columns.insert(column, Cell::List(values));
            }
        },
        Assignment::AddToSet(_, members) => match columns.get_mut(column) {
            Some(Cell::Set(set)) => set.extend(members),
            _ => {
                columns.insert(column, Cell::Set(members.into_iter().collect()));
            }
        },
        Assignment::RemoveFromSet(_, members) => {
            if let Some(Cell::Set(set)) = columns.get_mut(column) {
                for member in &members {
                    set.remove(member);
                }
            }
        }
    }
    // An empty collection is stored as null
    if columns.get(column).map_or(false, is_empty_collection) {
        columns.remove(column);
    }
}

impl WideColumnStore for MemoryStore {
    fn read(
        &self,
        table: &'static str,
        partition: &PartitionKey,
        key: &ClusteringKey,
    ) -> BackendResult<Option<Row>> {
        Self::read_fault(self.take_fault())?;
        let now = self.clock.now_ms();
        let found = match self.existing(table, partition) {
            Some(p) => {
                let guard = p.lock();
                guard.live(key, now).map(|r| r.to_row(key))
            }
            None => None,
        };
        Ok(found)
    }

    fn scan(&self, query: &RangeQuery) -> BackendResult<Page> {
        Self::read_fault(self.take_fault())?;
        let resume_after: Option<ClusteringKey> = match &query.page_token {
            Some(token) => Some(rmp_serde::from_slice(token).map_err(|e| {
                BackendError::InvalidStatement(format!("malformed page token: {}", e))
            })?),
            None => None,
        };
        let Some(partition) = self.existing(query.range.table, &query.range.partition) else {
            return Ok(Page {
                rows: Vec::new(),
                next_page_token: None,
            });
        };

        let page_size = query.page_size.max(1);
        let now = self.clock.now_ms();
        let partition = partition.lock();
        let lower = match &resume_after {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        let mut matching = partition
            .rows
            .range::<ClusteringKey, _>((lower, Bound::Unbounded))
            .filter(|(k, r)| r.is_live(now) && query.range.contains(k));

        let rows: Vec<Row> = matching
            .by_ref()
            .take(page_size)
            .map(|(k, r)| r.to_row(k))
            .collect();
        let next_page_token = match (matching.next(), rows.last()) {
            (Some(_), Some(last)) => Some(rmp_serde::to_vec(&last.key).map_err(|e| {
                BackendError::InvalidStatement(format!("page token encoding failed: {}", e))
            })?),
            _ => None,
        };
        Ok(Page {
            rows,
            next_page_token,
        })
    }

    fn execute(&self, statement: Statement) -> BackendResult<CasOutcome> {
        self.apply_statements(vec![statement])
    }

    fn batch(&self, batch: Batch) -> BackendResult<CasOutcome> {
        self.apply_statements(batch.statements)
    }

    fn delete_range(&self, range: &KeyRange) -> BackendResult<()> {
        match self.take_fault() {
            Some(Fault::Timeout { applied: false }) => {
                return Err(BackendError::Timeout("range delete timed out".into()))
            }
            Some(Fault::Timeout { applied: true }) => {
                if let Some(p) = self.existing(range.table, &range.partition) {
                    p.lock().rows.retain(|k, _| !range.contains(k));
                }
                return Err(BackendError::Timeout("range delete timed out after apply".into()));
            }
            Some(Fault::Throttled) => {
                return Err(BackendError::Throttled("range delete throttled".into()))
            }
            Some(Fault::Unavailable) => {
                return Err(BackendError::Unavailable("range delete unavailable".into()))
            }
            None => {}
        }
        if let Some(p) = self.existing(range.table, &range.partition) {
            p.lock().rows.retain(|k, _| !range.contains(k));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("partition_count", &self.partition_count())
            .field("pending_faults", &self.faults.lock().len())
            .finish()
    }
}
