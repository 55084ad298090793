//! Wide-column value model
//!
//! The backing store is partition-oriented: a [`PartitionKey`] selects the
//! unit of atomicity, a [`ClusteringKey`] orders rows inside it, and each row
//! carries named [`Cell`]s.
//!
//! ## Cell Types
//!
//! | Cell | Store analogue |
//! |------|----------------|
//! | `Bool`, `Int`, `Text`, `Uuid`, `Timestamp`, `Blob` | scalar columns |
//! | `Doc` | user-defined type (frozen document) |
//! | `Map` | `map<K, V>` collection, addressable per key |
//! | `Set` | `set<K>` collection |
//! | `List` | `list<V>` collection, append-only in practice |
//!
//! Rows are an adapter-internal representation. They are decoded into typed
//! records at the engine boundary and never escape it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Column names are fixed at compile time.
pub type ColumnName = &'static str;

/// One component of a partition or clustering key
///
/// Also used as the key type of map and set collections.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyPart {
    /// 64-bit signed integer
    Int(i64),
    /// UTF-8 text
    Text(String),
    /// UUID
    Uuid(Uuid),
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
}

impl KeyPart {
    /// Integer value, if this part is an `Int`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            KeyPart::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// UUID value, if this part is a `Uuid`
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            KeyPart::Uuid(v) => Some(*v),
            _ => None,
        }
    }

    /// Text value, if this part is `Text`
    pub fn as_text(&self) -> Option<&str> {
        match self {
            KeyPart::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for KeyPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyPart::Int(v) => write!(f, "{}", v),
            KeyPart::Text(v) => write!(f, "{:?}", v),
            KeyPart::Uuid(v) => write!(f, "{}", v),
            KeyPart::Timestamp(v) => write!(f, "ts:{}", v),
        }
    }
}

impl From<i64> for KeyPart {
    fn from(v: i64) -> Self {
        KeyPart::Int(v)
    }
}

impl From<&str> for KeyPart {
    fn from(v: &str) -> Self {
        KeyPart::Text(v.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(v: String) -> Self {
        KeyPart::Text(v)
    }
}

impl From<Uuid> for KeyPart {
    fn from(v: Uuid) -> Self {
        KeyPart::Uuid(v)
    }
}

/// Partition key: selects the unit of atomicity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionKey(Vec<KeyPart>);

impl PartitionKey {
    /// Create a partition key from its components
    pub fn new(parts: Vec<KeyPart>) -> Self {
        PartitionKey(parts)
    }

    /// Key components
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|p| p.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// Clustering key: orders rows within a partition
///
/// Ordering is lexicographic over the components, which gives range scans
/// over any prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusteringKey(Vec<KeyPart>);

impl ClusteringKey {
    /// Create a clustering key from its components
    pub fn new(parts: Vec<KeyPart>) -> Self {
        ClusteringKey(parts)
    }

    /// Key components
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Component at `index`
    pub fn part(&self, index: usize) -> Option<&KeyPart> {
        self.0.get(index)
    }

    /// Check whether this key begins with `prefix`
    pub fn starts_with(&self, prefix: &[KeyPart]) -> bool {
        self.0.starts_with(prefix)
    }
}

impl std::fmt::Display for ClusteringKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|p| p.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// UTF-8 text
    Text(String),
    /// UUID
    Uuid(Uuid),
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
    /// Opaque bytes
    Blob(Vec<u8>),
    /// Structured document (user-defined type)
    Doc(serde_json::Value),
    /// Keyed collection
    Map(BTreeMap<KeyPart, Cell>),
    /// Set collection
    Set(BTreeSet<KeyPart>),
    /// Ordered collection
    List(Vec<Cell>),
}

impl Cell {
    /// Returns the type name as a string (for error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Bool(_) => "Bool",
            Cell::Int(_) => "Int",
            Cell::Text(_) => "Text",
            Cell::Uuid(_) => "Uuid",
            Cell::Timestamp(_) => "Timestamp",
            Cell::Blob(_) => "Blob",
            Cell::Doc(_) => "Doc",
            Cell::Map(_) => "Map",
            Cell::Set(_) => "Set",
            Cell::List(_) => "List",
        }
    }

    /// Integer value, if this cell is an `Int`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// UUID value, if this cell is a `Uuid`
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Cell::Uuid(v) => Some(*v),
            _ => None,
        }
    }

    /// Text value, if this cell is `Text`
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Bytes, if this cell is a `Blob`
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Cell::Blob(v) => Some(v),
            _ => None,
        }
    }

    /// Document, if this cell is a `Doc`
    pub fn as_doc(&self) -> Option<&serde_json::Value> {
        match self {
            Cell::Doc(v) => Some(v),
            _ => None,
        }
    }

    /// Map entries, if this cell is a `Map`
    pub fn as_map(&self) -> Option<&BTreeMap<KeyPart, Cell>> {
        match self {
            Cell::Map(v) => Some(v),
            _ => None,
        }
    }

    /// List elements, if this cell is a `List`
    pub fn as_list(&self) -> Option<&[Cell]> {
        match self {
            Cell::List(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Bool(v) => write!(f, "{}", v),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Text(v) => write!(f, "{:?}", v),
            Cell::Uuid(v) => write!(f, "{}", v),
            Cell::Timestamp(v) => write!(f, "ts:{}", v),
            Cell::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Cell::Doc(v) => write!(f, "{}", v),
            Cell::Map(v) => write!(f, "map<{} entries>", v.len()),
            Cell::Set(v) => write!(f, "set<{} members>", v.len()),
            Cell::List(v) => write!(f, "list<{} elements>", v.len()),
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<bool> for Cell {
    fn from(v: bool) -> Self {
        Cell::Bool(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<Uuid> for Cell {
    fn from(v: Uuid) -> Self {
        Cell::Uuid(v)
    }
}

impl From<Vec<u8>> for Cell {
    fn from(v: Vec<u8>) -> Self {
        Cell::Blob(v)
    }
}

/// A row as returned by the backing store
///
/// Carries its clustering key so that callers can tell which logical record
/// (shard, current pointer, run, task) a returned row belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Clustering key of the row
    pub key: ClusteringKey,
    /// Populated columns; absent columns are null
    pub columns: BTreeMap<ColumnName, Cell>,
}

impl Row {
    /// Create an empty row for `key`
    pub fn new(key: ClusteringKey) -> Self {
        Self {
            key,
            columns: BTreeMap::new(),
        }
    }

    /// Column value, or `None` when null
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.columns.get(column)
    }

    /// Integer column value
    pub fn int(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Cell::as_int)
    }

    /// UUID column value
    pub fn uuid(&self, column: &str) -> Option<Uuid> {
        self.get(column).and_then(Cell::as_uuid)
    }

    /// Render key and columns as `k=v` pairs for diagnostics
    pub fn render(&self) -> String {
        let mut out = format!("key={}", self.key);
        for (name, cell) in &self.columns {
            out.push_str(&format!(",{}={}", name, cell));
        }
        out
    }
}
