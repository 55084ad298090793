//! Statement model
//!
//! Statements are plain values: table and column names are compile-time
//! constants, every key component and cell is a parameter. Nothing is ever
//! interpolated into a query string.
//!
//! ## Semantics
//!
//! - `Insert` and `Update` both upsert the named columns and leave the other
//!   columns of an existing row untouched.
//! - `Insert` owns the row's TTL: with a TTL the row expires, without one
//!   any previous expiry is cleared. `Update` only changes the expiry when it
//!   carries a TTL.
//! - A condition is evaluated against the row as it was before the batch.

use fencepost_core::value::ColumnName;
use fencepost_core::{Cell, ClusteringKey, KeyPart, PartitionKey, Row};
use smallvec::SmallVec;
use std::ops::Bound;

/// One column change
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// `col = value`
    Set(ColumnName, Cell),
    /// `col = null`
    Remove(ColumnName),
    /// `col[key] = value`
    PutMapEntry(ColumnName, KeyPart, Cell),
    /// `DELETE col[key]`
    RemoveMapEntry(ColumnName, KeyPart),
    /// `col = col + [values]`
    AppendList(ColumnName, Vec<Cell>),
    /// `col = col + {members}`
    AddToSet(ColumnName, Vec<KeyPart>),
    /// `col = col - {members}`
    RemoveFromSet(ColumnName, Vec<KeyPart>),
}

impl Assignment {
    /// Column the assignment touches
    pub fn column(&self) -> ColumnName {
        match self {
            Assignment::Set(c, _)
            | Assignment::Remove(c)
            | Assignment::PutMapEntry(c, _, _)
            | Assignment::RemoveMapEntry(c, _)
            | Assignment::AppendList(c, _)
            | Assignment::AddToSet(c, _)
            | Assignment::RemoveFromSet(c, _) => c,
        }
    }
}

/// Kind of write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Upsert that owns the row TTL
    Insert,
    /// Upsert
    Update,
    /// Remove the row
    Delete,
}

/// `col = value` predicate of a conditional statement
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Column
    pub column: ColumnName,
    /// Required value
    pub expected: Cell,
}

/// Lightweight-transaction condition
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Condition {
    /// Unconditional
    #[default]
    None,
    /// `IF NOT EXISTS`
    IfNotExists,
    /// `IF col = v AND ...`; fails on an absent row
    If(SmallVec<[Predicate; 2]>),
}

/// A single-row write
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Table
    pub table: &'static str,
    /// Partition
    pub partition: PartitionKey,
    /// Row
    pub key: ClusteringKey,
    /// Kind of write
    pub op: Operation,
    /// Column changes; must be empty for `Delete`
    pub assignments: Vec<Assignment>,
    /// Condition
    pub condition: Condition,
    /// Row time-to-live in seconds
    pub ttl_secs: Option<i64>,
}

impl Statement {
    fn new(table: &'static str, partition: PartitionKey, key: ClusteringKey, op: Operation) -> Self {
        Self {
            table,
            partition,
            key,
            op,
            assignments: Vec::new(),
            condition: Condition::None,
            ttl_secs: None,
        }
    }

    /// `INSERT INTO table ...`
    pub fn insert(table: &'static str, partition: PartitionKey, key: ClusteringKey) -> Self {
        Self::new(table, partition, key, Operation::Insert)
    }

    /// `UPDATE table ...`
    pub fn update(table: &'static str, partition: PartitionKey, key: ClusteringKey) -> Self {
        Self::new(table, partition, key, Operation::Update)
    }

    /// `DELETE FROM table ...`
    pub fn delete(table: &'static str, partition: PartitionKey, key: ClusteringKey) -> Self {
        Self::new(table, partition, key, Operation::Delete)
    }

    /// Add `column = value`
    pub fn set(mut self, column: ColumnName, value: impl Into<Cell>) -> Self {
        self.assignments.push(Assignment::Set(column, value.into()));
        self
    }

    /// Add an arbitrary assignment
    pub fn assign(mut self, assignment: Assignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    /// Add several assignments
    pub fn assign_all(mut self, assignments: impl IntoIterator<Item = Assignment>) -> Self {
        self.assignments.extend(assignments);
        self
    }

    /// Make the statement `IF NOT EXISTS`
    pub fn if_not_exists(mut self) -> Self {
        self.condition = Condition::IfNotExists;
        self
    }

    /// Add `column = expected` to the condition
    pub fn if_eq(mut self, column: ColumnName, expected: impl Into<Cell>) -> Self {
        let predicate = Predicate {
            column,
            expected: expected.into(),
        };
        match &mut self.condition {
            Condition::If(predicates) => predicates.push(predicate),
            _ => {
                let mut predicates = SmallVec::new();
                predicates.push(predicate);
                self.condition = Condition::If(predicates);
            }
        }
        self
    }

    /// Set the row TTL
    pub fn with_ttl(mut self, secs: i64) -> Self {
        self.ttl_secs = Some(secs);
        self
    }

    /// Whether the statement carries a condition
    pub fn is_conditional(&self) -> bool {
        !matches!(self.condition, Condition::None)
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self.op {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        };
        write!(f, "{} {}{}{}", verb, self.table, self.partition, self.key)?;
        match &self.condition {
            Condition::None => Ok(()),
            Condition::IfNotExists => write!(f, " IF NOT EXISTS"),
            Condition::If(predicates) => {
                let rendered: Vec<String> = predicates
                    .iter()
                    .map(|p| format!("{} = {}", p.column, p.expected))
                    .collect();
                write!(f, " IF {}", rendered.join(" AND "))
            }
        }
    }
}

/// Atomic group of statements against one partition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Statements in issue order
    pub statements: Vec<Statement>,
}

impl Batch {
    /// Empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement
    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Append several statements
    pub fn extend(&mut self, statements: impl IntoIterator<Item = Statement>) {
        self.statements.extend(statements);
    }

    /// Number of statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the batch has no statements
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Result of a write
#[derive(Debug, Clone, PartialEq)]
pub struct CasOutcome {
    /// Whether every condition held and the writes were applied
    pub applied: bool,
    /// When not applied, the existing rows targeted by conditional
    /// statements, in clustering order
    pub rows: Vec<Row>,
}

impl CasOutcome {
    /// Applied, no rows
    pub fn applied() -> Self {
        Self {
            applied: true,
            rows: Vec::new(),
        }
    }

    /// Not applied, with the blocking rows
    pub fn rejected(rows: Vec<Row>) -> Self {
        Self {
            applied: false,
            rows,
        }
    }
}

/// Range over the rows of one partition
///
/// Selects rows whose key starts with `prefix` and whose next component
/// (at index `prefix.len()`) lies within `lower..upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRange {
    /// Table
    pub table: &'static str,
    /// Partition
    pub partition: PartitionKey,
    /// Fixed leading key components
    pub prefix: Vec<KeyPart>,
    /// Lower bound of the ranged component
    pub lower: Bound<KeyPart>,
    /// Upper bound of the ranged component
    pub upper: Bound<KeyPart>,
}

impl KeyRange {
    /// Whether `key` falls in the range
    pub fn contains(&self, key: &ClusteringKey) -> bool {
        if !key.starts_with(&self.prefix) {
            return false;
        }
        let Some(part) = key.part(self.prefix.len()) else {
            return false;
        };
        let above = match &self.lower {
            Bound::Included(b) => part >= b,
            Bound::Excluded(b) => part > b,
            Bound::Unbounded => true,
        };
        let below = match &self.upper {
            Bound::Included(b) => part <= b,
            Bound::Excluded(b) => part < b,
            Bound::Unbounded => true,
        };
        above && below
    }
}

/// Paged range read
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    /// Rows to read
    pub range: KeyRange,
    /// Maximum rows per page
    pub page_size: usize,
    /// Continuation token from a previous page
    pub page_token: Option<Vec<u8>>,
}

/// One page of a range read
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Rows in clustering order
    pub rows: Vec<Row>,
    /// Opaque token for the next page; `None` when exhausted
    pub next_page_token: Option<Vec<u8>>,
}
