//! Shard record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ownership and queue progress of one shard
///
/// `range_id` is the shard's fencing token. A successful update always
/// carries a new value chosen by the caller, and every execution batch
/// re-checks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRecord {
    /// Shard id
    pub shard_id: i32,
    /// Identity of the owning host
    pub owner: String,
    /// Fencing token
    pub range_id: i64,
    /// Times the shard was stolen since the owner last renewed
    pub stolen_since_renew: i32,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Replication queue ack level
    pub replication_ack_level: i64,
    /// Transfer queue ack level of the current cluster
    pub transfer_ack_level: i64,
    /// Timer queue ack level of the current cluster
    pub timer_ack_level: DateTime<Utc>,
    /// Transfer ack level per cluster
    #[serde(default)]
    pub cluster_transfer_ack_level: BTreeMap<String, i64>,
    /// Timer ack level per cluster
    #[serde(default)]
    pub cluster_timer_ack_level: BTreeMap<String, DateTime<Utc>>,
    /// Last domain notification version processed
    pub domain_notification_version: i64,
}

impl ShardRecord {
    /// A fresh record for `shard_id` owned by `owner`
    pub fn new(shard_id: i32, owner: impl Into<String>, range_id: i64) -> Self {
        let now = Utc::now();
        Self {
            shard_id,
            owner: owner.into(),
            range_id,
            stolen_since_renew: 0,
            updated_at: now,
            replication_ack_level: 0,
            transfer_ack_level: 0,
            timer_ack_level: now,
            cluster_transfer_ack_level: BTreeMap::new(),
            cluster_timer_ack_level: BTreeMap::new(),
            domain_notification_version: 0,
        }
    }

    /// Fill missing per-cluster ack levels of `cluster` from the scalar ones
    ///
    /// Records written before per-cluster tracking only carry the scalar
    /// levels.
    pub fn backfill_cluster_ack_levels(&mut self, cluster: &str) {
        self.cluster_transfer_ack_level
            .entry(cluster.to_string())
            .or_insert(self.transfer_ack_level);
        self.cluster_timer_ack_level
            .entry(cluster.to_string())
            .or_insert(self.timer_ack_level);
    }
}
