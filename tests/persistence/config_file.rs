//! Configuration loading tests

use crate::*;
use fencepost::ConfigError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file
}

#[test]
fn test_open_from_file() {
    let file = write_config(
        r#"
current_cluster_name = "standby"
sticky_task_list_ttl_secs = 60
"#,
    );
    let persistence = Persistence::builder()
        .config_file(file.path())
        .unwrap()
        .open()
        .unwrap();

    let config = persistence.config();
    assert_eq!(config.current_cluster_name, "standby");
    assert_eq!(config.sticky_task_list_ttl_secs, 60);
    assert_eq!(config.max_task_ttl_secs, 630_720_000);
    assert_eq!(config.default_page_size, 100);
}

#[test]
fn test_invalid_file_is_rejected() {
    let file = write_config("default_page_size = 0\n");
    let err = Persistence::builder().config_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let file = write_config("current_cluster_name = [\n");
    let err = Persistence::builder().config_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Persistence::builder()
        .config_file(dir.path().join("absent.toml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_builder_validates_on_open() {
    let err = Persistence::builder().cluster_name("  ").open().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_cluster_name_backfills_shard_ack_levels() {
    let persistence = Persistence::builder().cluster_name("west").open().unwrap();
    let shards = persistence.shard_store();
    let mut record = ShardRecord::new(1, "host-a", 1);
    record.transfer_ack_level = 77;
    shards.create_shard(&record).unwrap();

    let shard = shards.get_shard(1).unwrap();
    assert_eq!(shard.cluster_transfer_ack_level.get("west"), Some(&77));
}
