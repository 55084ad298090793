//! Store configuration
//!
//! Tunables shared by every store. Loaded from TOML; any key left out takes
//! its default.
//!
//! ```toml
//! current_cluster_name = "active"
//! sticky_task_list_ttl_secs = 86400
//! max_task_ttl_secs = 630720000
//! default_page_size = 100
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid TOML for this shape
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables of the persistence stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Cluster whose per-cluster ack levels are back-filled on shard reads
    pub current_cluster_name: String,
    /// Row TTL of sticky task lists
    pub sticky_task_list_ttl_secs: i64,
    /// Cap applied to task TTLs
    pub max_task_ttl_secs: i64,
    /// Page size used when a request asks for zero rows
    pub default_page_size: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            current_cluster_name: "active".to_string(),
            sticky_task_list_ttl_secs: 24 * 60 * 60,
            max_task_ttl_secs: 630_720_000,
            default_page_size: 100,
        }
    }
}

impl PersistenceConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PersistenceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.current_cluster_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "current_cluster_name must not be empty".into(),
            ));
        }
        if self.sticky_task_list_ttl_secs <= 0 {
            return Err(ConfigError::Invalid(format!(
                "sticky_task_list_ttl_secs must be positive, got {}",
                self.sticky_task_list_ttl_secs
            )));
        }
        if self.max_task_ttl_secs <= 0 {
            return Err(ConfigError::Invalid(format!(
                "max_task_ttl_secs must be positive, got {}",
                self.max_task_ttl_secs
            )));
        }
        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid(
                "default_page_size must be positive".into(),
            ));
        }
        Ok(())
    }

    /// `requested`, or the default page size when it is zero
    pub fn page_size(&self, requested: usize) -> usize {
        if requested == 0 {
            self.default_page_size
        } else {
            requested
        }
    }
}
