//! Main entry point for fencepost.
//!
//! This module provides the `Persistence` struct, which owns the backend
//! handle, schema and configuration shared by every store.

use fencepost_core::SchemaConstants;
use fencepost_engine::{
    ConfigError, ExecutionStore, PersistenceConfig, QueueStore, ShardStore, TaskListStore,
};
use fencepost_storage::{MemoryStore, WideColumnStore};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Persistence for one cluster.
///
/// Stores are cheap to create: they share the backend handle, schema and
/// configuration by `Arc`. The shard owner creates one execution store and
/// one queue store per shard it holds.
///
/// # Example
///
/// ```ignore
/// use fencepost::prelude::*;
///
/// let persistence = Persistence::ephemeral();
/// let shards = persistence.shard_store();
/// shards.create_shard(&ShardRecord::new(1, "host-a", 1))?;
///
/// let executions = persistence.execution_store(1);
/// executions.create_workflow_execution(&request)?;
/// ```
pub struct Persistence {
    backend: Arc<dyn WideColumnStore>,
    schema: Arc<SchemaConstants>,
    config: Arc<PersistenceConfig>,
}

impl Persistence {
    /// Create persistence over an in-process [`MemoryStore`] with default
    /// settings.
    ///
    /// Use this for tests and single-process deployments.
    pub fn ephemeral() -> Self {
        Self {
            backend: Arc::new(MemoryStore::new()),
            schema: SchemaConstants::v1(),
            config: Arc::new(PersistenceConfig::default()),
        }
    }

    /// Create a builder for persistence configuration.
    pub fn builder() -> PersistenceBuilder {
        PersistenceBuilder::new()
    }

    /// Shard records and shard leases.
    pub fn shard_store(&self) -> ShardStore {
        ShardStore::new(self.backend.clone(), self.schema.clone(), self.config.clone())
    }

    /// Runs and current pointers of `shard_id`.
    pub fn execution_store(&self, shard_id: i32) -> ExecutionStore {
        ExecutionStore::new(shard_id, self.backend.clone(), self.schema.clone())
    }

    /// Transfer, timer and replication queues of `shard_id`.
    pub fn queue_store(&self, shard_id: i32) -> QueueStore {
        QueueStore::new(
            shard_id,
            self.backend.clone(),
            self.schema.clone(),
            self.config.clone(),
        )
    }

    /// Worker task lists.
    pub fn task_list_store(&self) -> TaskListStore {
        TaskListStore::new(self.backend.clone(), self.schema.clone(), self.config.clone())
    }

    /// Get the active configuration.
    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    /// Get the schema constants.
    pub fn schema(&self) -> &SchemaConstants {
        &self.schema
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for persistence configuration.
///
/// # Example
///
/// ```ignore
/// // Production: a real backend and a config file
/// let persistence = Persistence::builder()
///     .backend(cluster_client)
///     .config_file("/etc/fencepost.toml")?
///     .open()?;
///
/// // Tests: in-memory backend with a manual clock
/// let persistence = Persistence::builder()
///     .backend(Arc::new(MemoryStore::with_clock(clock)))
///     .open()?;
/// ```
pub struct PersistenceBuilder {
    backend: Option<Arc<dyn WideColumnStore>>,
    schema: Option<Arc<SchemaConstants>>,
    config: PersistenceConfig,
}

impl PersistenceBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            backend: None,
            schema: None,
            config: PersistenceConfig::default(),
        }
    }

    /// Set the backing store.
    ///
    /// Defaults to a fresh [`MemoryStore`].
    pub fn backend(mut self, backend: Arc<dyn WideColumnStore>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the schema constants.
    ///
    /// Defaults to [`SchemaConstants::v1`].
    pub fn schema(mut self, schema: Arc<SchemaConstants>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: PersistenceConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// `ConfigError::Io` if the file cannot be read, `ConfigError::Parse`
    /// if it is not valid TOML for [`PersistenceConfig`].
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        self.config = PersistenceConfig::from_file(path)?;
        Ok(self)
    }

    /// Set the name of the cluster this process runs in.
    pub fn cluster_name(mut self, name: impl Into<String>) -> Self {
        self.config.current_cluster_name = name.into();
        self
    }

    /// Validate the configuration and build.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` if the configuration fails validation.
    pub fn open(self) -> Result<Persistence, ConfigError> {
        self.config.validate()?;
        let schema = self.schema.unwrap_or_else(SchemaConstants::v1);
        let backend: Arc<dyn WideColumnStore> = match self.backend {
            Some(backend) => backend,
            None => Arc::new(MemoryStore::new()),
        };
        debug!(
            cluster = %self.config.current_cluster_name,
            page_size = self.config.default_page_size,
            "persistence opened"
        );
        Ok(Persistence {
            backend,
            schema,
            config: Arc::new(self.config),
        })
    }
}

impl Default for PersistenceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PersistenceBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceBuilder")
            .field("has_backend", &self.backend.is_some())
            .field("config", &self.config)
            .finish()
    }
}
