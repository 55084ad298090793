//! Row codecs
//!
//! Stored rows are decoded here, once, into the typed records of
//! `fencepost_core::records`. Nothing above this module sees a [`Row`].
//!
//! # Layout
//!
//! | Column | Cell | Content |
//! |--------|------|---------|
//! | `shard` | doc | [`ShardRecord`] |
//! | `execution` (run row) | doc | [`WorkflowExecutionInfo`], parent flattened with sentinels |
//! | `execution` (current row) | doc | run id, create request id, state, close status |
//! | `replication_state` (run row) | doc | [`ReplicationState`] |
//! | `replication_state` (current row) | doc | start and last write version |
//! | `version_histories` | blob | opaque, tagged by `version_histories_encoding` |
//! | `*_map` | map | one doc per sub-collection entry |
//! | `signal_requested` | set | request ids |
//! | `buffered_events_list` | list | one doc per [`DataBlob`] |
//! | `transfer` / `timer` / `replication` | doc | task info |
//! | `task_list` / `task` | doc | task list header / task |
//!
//! Any mismatch between a stored cell and the expected shape is schema
//! drift: it is logged and reported as `Internal`.

use chrono::{DateTime, Utc};
use fencepost_core::records::{
    ActivityInfo, ChildExecutionInfo, CloseStatus, CurrentExecution, ParentExecution,
    ReplicationMode, RequestCancelInfo, ShardRecord, SignalInfo, TaskInfo, TaskListInfo,
    TaskListKind, TaskListType, TimerInfo, WorkflowExecutionInfo, WorkflowMutableState,
    WorkflowState,
};
use fencepost_core::schema::columns;
use fencepost_core::value::ColumnName;
use fencepost_core::{
    Cell, DataBlob, DomainId, EncodingType, KeyPart, PersistenceError, Result, Row, RunId,
    SchemaConstants, EMPTY_VERSION,
};
use fencepost_storage::Assignment;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::error;
use uuid::Uuid;

// ============================================================================
// Primitives
// ============================================================================

fn drift(row: &Row, column: &str, detail: impl std::fmt::Display) -> PersistenceError {
    error!(column, row = %row.key, %detail, "stored column does not decode");
    PersistenceError::internal(format!(
        "malformed column {} in row {}: {}",
        column, row.key, detail
    ))
}

/// Encode a value as a document cell
pub(crate) fn to_doc<T: Serialize>(value: &T) -> Result<Cell> {
    Ok(Cell::Doc(serde_json::to_value(value)?))
}

fn from_value<T: DeserializeOwned>(row: &Row, column: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| drift(row, column, e))
}

/// Decode a required document column
pub(crate) fn decode_doc<T: DeserializeOwned>(row: &Row, column: ColumnName) -> Result<T> {
    match row.get(column) {
        Some(Cell::Doc(value)) => from_value(row, column, value.clone()),
        Some(other) => Err(drift(row, column, format!("expected doc, found {}", other.type_name()))),
        None => Err(drift(row, column, "missing")),
    }
}

/// Decode a required integer column
pub(crate) fn decode_int(row: &Row, column: ColumnName) -> Result<i64> {
    row.int(column).ok_or_else(|| drift(row, column, "missing or not an int"))
}

// ============================================================================
// Shard row
// ============================================================================

/// Columns of the shard row
pub(crate) fn shard_assignments(record: &ShardRecord) -> Result<Vec<Assignment>> {
    Ok(vec![
        Assignment::Set(columns::SHARD, to_doc(record)?),
        Assignment::Set(columns::RANGE_ID, Cell::Int(record.range_id)),
    ])
}

/// Decode the shard row; the `range_id` column is authoritative
pub(crate) fn decode_shard(row: &Row) -> Result<ShardRecord> {
    let mut record: ShardRecord = decode_doc(row, columns::SHARD)?;
    record.range_id = decode_int(row, columns::RANGE_ID)?;
    Ok(record)
}

// ============================================================================
// Run row
// ============================================================================

const PARENT_DOMAIN_ID: &str = "parent_domain_id";
const PARENT_WORKFLOW_ID: &str = "parent_workflow_id";
const PARENT_RUN_ID: &str = "parent_run_id";
const INITIATED_ID: &str = "initiated_id";

/// Encode execution info; a missing parent is stored as sentinel ids
pub(crate) fn execution_doc(
    schema: &SchemaConstants,
    info: &WorkflowExecutionInfo,
) -> Result<Cell> {
    let mut value = serde_json::to_value(info)?;
    let Value::Object(fields) = &mut value else {
        return Err(PersistenceError::internal("execution info is not an object"));
    };
    fields.remove("parent");
    let (domain_id, workflow_id, run_id, initiated_id) = match &info.parent {
        Some(parent) => (
            parent.domain_id.as_uuid(),
            parent.workflow_id.clone(),
            parent.run_id.as_uuid(),
            parent.initiated_id,
        ),
        None => (
            schema.empty_domain_id,
            String::new(),
            schema.empty_run_id,
            schema.empty_initiated_id,
        ),
    };
    fields.insert(PARENT_DOMAIN_ID.into(), serde_json::to_value(domain_id)?);
    fields.insert(PARENT_WORKFLOW_ID.into(), Value::String(workflow_id));
    fields.insert(PARENT_RUN_ID.into(), serde_json::to_value(run_id)?);
    fields.insert(INITIATED_ID.into(), Value::from(initiated_id));
    Ok(Cell::Doc(value))
}

/// Decode execution info, folding the sentinel parent back into `None`
pub(crate) fn decode_execution(
    schema: &SchemaConstants,
    row: &Row,
) -> Result<WorkflowExecutionInfo> {
    let column = columns::EXECUTION;
    let mut value = match row.get(column) {
        Some(Cell::Doc(value)) => value.clone(),
        _ => return Err(drift(row, column, "missing or not a doc")),
    };
    let Value::Object(fields) = &mut value else {
        return Err(drift(row, column, "not an object"));
    };
    let mut take = |name: &str| fields.remove(name).unwrap_or(Value::Null);
    let domain_id: Uuid = from_value(row, column, take(PARENT_DOMAIN_ID))?;
    let workflow_id: String = from_value(row, column, take(PARENT_WORKFLOW_ID))?;
    let run_id: Uuid = from_value(row, column, take(PARENT_RUN_ID))?;
    let initiated_id: i64 = from_value(row, column, take(INITIATED_ID))?;
    let parent = if domain_id == schema.empty_domain_id {
        None
    } else {
        Some(ParentExecution {
            domain_id: DomainId::from_uuid(domain_id),
            workflow_id,
            run_id: RunId::from_uuid(run_id),
            initiated_id,
        })
    };
    fields.insert("parent".into(), serde_json::to_value(parent)?);
    from_value(row, column, value)
}

/// Columns of the replication arm; the other arm's columns are cleared
pub(crate) fn replication_assignments(mode: &ReplicationMode) -> Result<Vec<Assignment>> {
    Ok(match mode {
        ReplicationMode::Legacy => vec![
            Assignment::Remove(columns::REPLICATION_STATE),
            Assignment::Remove(columns::VERSION_HISTORIES),
            Assignment::Remove(columns::VERSION_HISTORIES_ENCODING),
        ],
        ReplicationMode::ReplicationState(state) => vec![
            Assignment::Set(columns::REPLICATION_STATE, to_doc(state)?),
            Assignment::Remove(columns::VERSION_HISTORIES),
            Assignment::Remove(columns::VERSION_HISTORIES_ENCODING),
        ],
        ReplicationMode::VersionHistories(blob) => vec![
            Assignment::Remove(columns::REPLICATION_STATE),
            Assignment::Set(columns::VERSION_HISTORIES, Cell::Blob(blob.data.clone())),
            Assignment::Set(
                columns::VERSION_HISTORIES_ENCODING,
                Cell::Text(blob.encoding.as_str().to_string()),
            ),
        ],
    })
}

/// Decode the replication arm of a run row
///
/// A row with both arms populated cannot be represented and is rejected.
pub(crate) fn decode_replication(row: &Row) -> Result<ReplicationMode> {
    match (
        row.get(columns::REPLICATION_STATE),
        row.get(columns::VERSION_HISTORIES),
    ) {
        (Some(_), Some(_)) => Err(drift(
            row,
            columns::REPLICATION_STATE,
            "both replication state and version histories are set",
        )),
        (Some(_), None) => Ok(ReplicationMode::ReplicationState(decode_doc(
            row,
            columns::REPLICATION_STATE,
        )?)),
        (None, Some(cell)) => {
            let data = cell
                .as_blob()
                .ok_or_else(|| drift(row, columns::VERSION_HISTORIES, "not a blob"))?;
            let encoding: EncodingType = row
                .get(columns::VERSION_HISTORIES_ENCODING)
                .and_then(Cell::as_text)
                .ok_or_else(|| drift(row, columns::VERSION_HISTORIES_ENCODING, "missing"))?
                .parse()
                .map_err(|e: String| drift(row, columns::VERSION_HISTORIES_ENCODING, e))?;
            Ok(ReplicationMode::VersionHistories(DataBlob::new(encoding, data)))
        }
        (None, None) => Ok(ReplicationMode::Legacy),
    }
}

/// Scalar columns of a run row: info, lock column, replication arm
pub(crate) fn scalar_assignments(
    schema: &SchemaConstants,
    info: &WorkflowExecutionInfo,
    replication: &ReplicationMode,
) -> Result<Vec<Assignment>> {
    let mut out = vec![
        Assignment::Set(columns::EXECUTION, execution_doc(schema, info)?),
        Assignment::Set(columns::NEXT_EVENT_ID, Cell::Int(info.next_event_id)),
    ];
    out.extend(replication_assignments(replication)?);
    Ok(out)
}

fn encode_map<K, V>(entries: &BTreeMap<K, V>) -> Result<Cell>
where
    K: Clone + Into<KeyPart>,
    V: Serialize,
{
    let mut map = BTreeMap::new();
    for (key, value) in entries {
        map.insert(key.clone().into(), to_doc(value)?);
    }
    Ok(Cell::Map(map))
}

fn decode_map<K, V>(
    row: &Row,
    column: ColumnName,
    key_of: fn(&KeyPart) -> Option<K>,
) -> Result<BTreeMap<K, V>>
where
    K: Ord,
    V: DeserializeOwned,
{
    let entries = match row.get(column) {
        None => return Ok(BTreeMap::new()),
        Some(Cell::Map(entries)) => entries,
        Some(other) => {
            return Err(drift(row, column, format!("expected map, found {}", other.type_name())))
        }
    };
    let mut out = BTreeMap::new();
    for (key, cell) in entries {
        let key = key_of(key).ok_or_else(|| drift(row, column, format!("bad key {}", key)))?;
        let value = match cell {
            Cell::Doc(value) => from_value(row, column, value.clone())?,
            other => {
                return Err(drift(row, column, format!("expected doc, found {}", other.type_name())))
            }
        };
        out.insert(key, value);
    }
    Ok(out)
}

fn int_key(key: &KeyPart) -> Option<i64> {
    key.as_int()
}

fn text_key(key: &KeyPart) -> Option<String> {
    key.as_text().map(str::to_string)
}

/// Encode a sub-collection entry
pub(crate) fn entry<V: Serialize>(
    column: ColumnName,
    key: impl Into<KeyPart>,
    value: &V,
) -> Result<Assignment> {
    Ok(Assignment::PutMapEntry(column, key.into(), to_doc(value)?))
}

/// Encode a buffered event batch
pub(crate) fn buffered_event(blob: &DataBlob) -> Result<Cell> {
    to_doc(blob)
}

/// Request ids as set members
pub(crate) fn request_ids<'a>(ids: impl IntoIterator<Item = &'a String>) -> Vec<KeyPart> {
    ids.into_iter().map(|id| KeyPart::Text(id.clone())).collect()
}

/// Every column of a run row, replacing all sub-collections
pub(crate) fn snapshot_assignments(
    schema: &SchemaConstants,
    state: &WorkflowMutableState,
) -> Result<Vec<Assignment>> {
    let mut out = scalar_assignments(schema, &state.execution_info, &state.replication)?;
    out.push(Assignment::Set(columns::ACTIVITY_MAP, encode_map(&state.activity_infos)?));
    out.push(Assignment::Set(columns::TIMER_MAP, encode_map(&state.timer_infos)?));
    out.push(Assignment::Set(
        columns::CHILD_EXECUTIONS_MAP,
        encode_map(&state.child_execution_infos)?,
    ));
    out.push(Assignment::Set(
        columns::REQUEST_CANCEL_MAP,
        encode_map(&state.request_cancel_infos)?,
    ));
    out.push(Assignment::Set(columns::SIGNAL_MAP, encode_map(&state.signal_infos)?));
    out.push(Assignment::Set(
        columns::SIGNAL_REQUESTED,
        Cell::Set(request_ids(&state.signal_requested).into_iter().collect()),
    ));
    let mut events = Vec::with_capacity(state.buffered_events.len());
    for blob in &state.buffered_events {
        events.push(buffered_event(blob)?);
    }
    out.push(Assignment::Set(columns::BUFFERED_EVENTS_LIST, Cell::List(events)));
    Ok(out)
}

/// Decode a full run row
pub(crate) fn decode_mutable_state(
    schema: &SchemaConstants,
    row: &Row,
) -> Result<WorkflowMutableState> {
    let execution_info = decode_execution(schema, row)?;
    let replication = decode_replication(row)?;
    let mut state = WorkflowMutableState::new(execution_info, replication);
    state.activity_infos = decode_map::<i64, ActivityInfo>(row, columns::ACTIVITY_MAP, int_key)?;
    state.timer_infos = decode_map::<String, TimerInfo>(row, columns::TIMER_MAP, text_key)?;
    state.child_execution_infos =
        decode_map::<i64, ChildExecutionInfo>(row, columns::CHILD_EXECUTIONS_MAP, int_key)?;
    state.request_cancel_infos =
        decode_map::<i64, RequestCancelInfo>(row, columns::REQUEST_CANCEL_MAP, int_key)?;
    state.signal_infos = decode_map::<i64, SignalInfo>(row, columns::SIGNAL_MAP, int_key)?;
    state.signal_requested = match row.get(columns::SIGNAL_REQUESTED) {
        None => BTreeSet::new(),
        Some(Cell::Set(members)) => members
            .iter()
            .map(|m| {
                text_key(m).ok_or_else(|| drift(row, columns::SIGNAL_REQUESTED, "non-text member"))
            })
            .collect::<Result<_>>()?,
        Some(other) => {
            return Err(drift(
                row,
                columns::SIGNAL_REQUESTED,
                format!("expected set, found {}", other.type_name()),
            ))
        }
    };
    state.buffered_events = match row.get(columns::BUFFERED_EVENTS_LIST) {
        None => Vec::new(),
        Some(Cell::List(items)) => items
            .iter()
            .map(|item| match item {
                Cell::Doc(value) => from_value(row, columns::BUFFERED_EVENTS_LIST, value.clone()),
                other => Err(drift(
                    row,
                    columns::BUFFERED_EVENTS_LIST,
                    format!("expected doc, found {}", other.type_name()),
                )),
            })
            .collect::<Result<_>>()?,
        Some(other) => {
            return Err(drift(
                row,
                columns::BUFFERED_EVENTS_LIST,
                format!("expected list, found {}", other.type_name()),
            ))
        }
    };
    Ok(state)
}

// ============================================================================
// Current row
// ============================================================================

#[derive(Serialize, Deserialize)]
struct CurrentRunDoc {
    run_id: RunId,
    create_request_id: String,
    state: WorkflowState,
    close_status: CloseStatus,
}

#[derive(Serialize, Deserialize)]
struct CurrentVersionsDoc {
    start_version: i64,
    last_write_version: i64,
}

/// Columns of the current pointer naming `info.run_id`
pub(crate) fn current_assignments(
    info: &WorkflowExecutionInfo,
    replication: &ReplicationMode,
) -> Result<Vec<Assignment>> {
    let run = CurrentRunDoc {
        run_id: info.run_id,
        create_request_id: info.create_request_id.clone(),
        state: info.state,
        close_status: info.close_status,
    };
    let versions = CurrentVersionsDoc {
        start_version: replication.start_version(),
        last_write_version: replication.last_write_version(),
    };
    Ok(vec![
        Assignment::Set(columns::CURRENT_RUN_ID, Cell::Uuid(info.run_id.as_uuid())),
        Assignment::Set(columns::EXECUTION, to_doc(&run)?),
        Assignment::Set(columns::REPLICATION_STATE, to_doc(&versions)?),
        Assignment::Set(
            columns::WORKFLOW_LAST_WRITE_VERSION,
            Cell::Int(replication.last_write_version()),
        ),
        Assignment::Set(columns::WORKFLOW_STATE, Cell::Int(info.state.as_i64())),
    ])
}

/// Decode the current pointer; the `current_run_id` column is authoritative
pub(crate) fn decode_current(row: &Row) -> Result<CurrentExecution> {
    let run_id = row
        .uuid(columns::CURRENT_RUN_ID)
        .map(RunId::from_uuid)
        .ok_or_else(|| drift(row, columns::CURRENT_RUN_ID, "missing"))?;
    let run: CurrentRunDoc = decode_doc(row, columns::EXECUTION)?;
    let versions = match row.get(columns::REPLICATION_STATE) {
        Some(_) => decode_doc(row, columns::REPLICATION_STATE)?,
        None => CurrentVersionsDoc {
            start_version: EMPTY_VERSION,
            last_write_version: EMPTY_VERSION,
        },
    };
    Ok(CurrentExecution {
        run_id,
        create_request_id: run.create_request_id,
        state: run.state,
        close_status: run.close_status,
        start_version: versions.start_version,
        last_write_version: versions.last_write_version,
    })
}

// ============================================================================
// Task lists
// ============================================================================

#[derive(Serialize, Deserialize)]
struct TaskListDoc {
    domain_id: DomainId,
    name: String,
    task_type: TaskListType,
    ack_level: i64,
    kind: TaskListKind,
    last_updated: DateTime<Utc>,
}

/// Columns of a task-list header row
pub(crate) fn task_list_assignments(info: &TaskListInfo) -> Result<Vec<Assignment>> {
    let doc = TaskListDoc {
        domain_id: info.domain_id,
        name: info.name.clone(),
        task_type: info.task_type,
        ack_level: info.ack_level,
        kind: info.kind,
        last_updated: info.last_updated,
    };
    Ok(vec![
        Assignment::Set(columns::RANGE_ID, Cell::Int(info.range_id)),
        Assignment::Set(columns::TASK_LIST, to_doc(&doc)?),
    ])
}

/// Decode a task-list header row
pub(crate) fn decode_task_list(row: &Row) -> Result<TaskListInfo> {
    let doc: TaskListDoc = decode_doc(row, columns::TASK_LIST)?;
    Ok(TaskListInfo {
        domain_id: doc.domain_id,
        name: doc.name,
        task_type: doc.task_type,
        range_id: decode_int(row, columns::RANGE_ID)?,
        ack_level: doc.ack_level,
        kind: doc.kind,
        last_updated: doc.last_updated,
    })
}

/// Decode a task row; the task id comes from the key
pub(crate) fn decode_task(row: &Row) -> Result<TaskInfo> {
    let mut task: TaskInfo = decode_doc(row, columns::TASK)?;
    if let Some(task_id) = row.key.parts().last().and_then(KeyPart::as_int) {
        task.task_id = task_id;
    }
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fencepost_core::records::{ReplicationInfo, ReplicationState};
    use fencepost_core::ClusteringKey;
    use fencepost_storage::Statement;

    fn row_from(assignments: Vec<Assignment>) -> Row {
        let mut row = Row::new(ClusteringKey::new(vec![KeyPart::Int(1)]));
        for a in assignments {
            match a {
                Assignment::Set(c, v) => {
                    row.columns.insert(c, v);
                }
                Assignment::Remove(c) => {
                    row.columns.remove(c);
                }
                other => panic!("unexpected assignment {:?}", other),
            }
        }
        row
    }

    fn info() -> WorkflowExecutionInfo {
        let mut info = WorkflowExecutionInfo::new(DomainId::new(), "wf", RunId::new());
        info.next_event_id = 12;
        info.create_request_id = "req-1".into();
        info
    }

    #[test]
    fn test_execution_without_parent_uses_sentinels() {
        let schema = SchemaConstants::v1();
        let info = info();
        let cell = execution_doc(&schema, &info).unwrap();
        let doc = cell.as_doc().unwrap();
        assert_eq!(doc[PARENT_DOMAIN_ID], Value::String(schema.empty_domain_id.to_string()));
        assert_eq!(doc[INITIATED_ID], Value::from(schema.empty_initiated_id));
        assert!(doc.get("parent").is_none());

        let row = row_from(vec![Assignment::Set(columns::EXECUTION, cell)]);
        assert_eq!(decode_execution(&schema, &row).unwrap(), info);
    }

    #[test]
    fn test_execution_with_parent_roundtrip() {
        let schema = SchemaConstants::v1();
        let mut info = info();
        info.parent = Some(ParentExecution {
            domain_id: DomainId::new(),
            workflow_id: "parent-wf".into(),
            run_id: RunId::new(),
            initiated_id: 5,
        });
        let row = row_from(vec![Assignment::Set(
            columns::EXECUTION,
            execution_doc(&schema, &info).unwrap(),
        )]);
        assert_eq!(decode_execution(&schema, &row).unwrap(), info);
    }

    #[test]
    fn test_replication_arms_are_exclusive_on_write() {
        let blob = DataBlob::new(EncodingType::ThriftRw, vec![1, 2]);
        let row = row_from(replication_assignments(&ReplicationMode::VersionHistories(blob.clone())).unwrap());
        assert!(row.get(columns::REPLICATION_STATE).is_none());
        assert_eq!(decode_replication(&row).unwrap(), ReplicationMode::VersionHistories(blob));
    }

    #[test]
    fn test_replication_state_roundtrip() {
        let mut state = ReplicationState {
            current_version: 3,
            start_version: 1,
            last_write_version: 3,
            last_write_event_id: 40,
            last_replication_info: BTreeMap::new(),
        };
        state.last_replication_info.insert(
            "standby".into(),
            ReplicationInfo {
                version: 2,
                last_event_id: 30,
            },
        );
        let mode = ReplicationMode::ReplicationState(state);
        let row = row_from(replication_assignments(&mode).unwrap());
        assert_eq!(decode_replication(&row).unwrap(), mode);
    }

    #[test]
    fn test_both_replication_columns_is_internal() {
        let mut row = row_from(vec![]);
        row.columns.insert(columns::REPLICATION_STATE, Cell::Doc(serde_json::json!({})));
        row.columns.insert(columns::VERSION_HISTORIES, Cell::Blob(vec![1]));
        let err = decode_replication(&row).unwrap_err();
        assert!(matches!(err, PersistenceError::Internal(_)));
    }

    #[test]
    fn test_legacy_when_neither_column() {
        assert_eq!(decode_replication(&row_from(vec![])).unwrap(), ReplicationMode::Legacy);
    }

    #[test]
    fn test_current_pointer_roundtrip() {
        let info = info();
        let row = row_from(current_assignments(&info, &ReplicationMode::Legacy).unwrap());
        let current = decode_current(&row).unwrap();
        assert_eq!(current.run_id, info.run_id);
        assert_eq!(current.create_request_id, "req-1");
        assert_eq!(current.last_write_version, EMPTY_VERSION);
        assert_eq!(row.int(columns::WORKFLOW_STATE), Some(WorkflowState::Created.as_i64()));
    }

    #[test]
    fn test_shard_range_column_is_authoritative() {
        let record = ShardRecord::new(3, "host", 7);
        let mut row = row_from(shard_assignments(&record).unwrap());
        row.columns.insert(columns::RANGE_ID, Cell::Int(9));
        assert_eq!(decode_shard(&row).unwrap().range_id, 9);
    }

    #[test]
    fn test_wrong_cell_type_is_internal() {
        let mut row = row_from(vec![]);
        row.columns.insert(columns::SHARD, Cell::Int(1));
        assert!(matches!(decode_shard(&row), Err(PersistenceError::Internal(_))));
    }

    #[test]
    fn test_snapshot_roundtrip_through_store_cells() {
        let schema = SchemaConstants::v1();
        let mut state = WorkflowMutableState::new(info(), ReplicationMode::Legacy);
        state.signal_requested.insert("sig-1".into());
        state.buffered_events.push(DataBlob::new(EncodingType::Json, b"{}".to_vec()));
        state.request_cancel_infos.insert(
            9,
            RequestCancelInfo {
                version: 1,
                initiated_id: 9,
                cancel_request_id: "c".into(),
            },
        );
        let stmt = Statement::insert("executions", schema.shard_partition(1), ClusteringKey::new(vec![]))
            .assign_all(snapshot_assignments(&schema, &state).unwrap());
        let mut row = Row::new(stmt.key.clone());
        for a in stmt.assignments {
            if let Assignment::Set(c, v) = a {
                row.columns.insert(c, v);
            }
        }
        assert_eq!(decode_mutable_state(&schema, &row).unwrap(), state);
    }
}
