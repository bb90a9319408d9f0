//! Run configuration
//!
//! Loaded from a YAML file when one is given; every field has a default so
//! a partial file (or none) is fine. CLI flags override file values.

use crate::ingest::DEFAULT_CHUNK_SIZE;
use crate::storage::LookupStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Knobs for one ingestion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Consume at most this many input records
    pub row_cap: Option<usize>,
    /// Create identifier indexes and use index-assisted lookups
    pub use_index: bool,
    /// Create nodes through the bulk loader instead of one by one
    pub use_batch_insert: bool,
    /// Nodes per bulk statement
    pub chunk_size: usize,
    /// Wipe and rebuild even if the store looks populated
    pub force_rebuild: bool,
    /// Drop existing indexes before a per-item rebuild
    pub drop_indexes_on_rebuild: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            row_cap: None,
            use_index: true,
            use_batch_insert: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            force_rebuild: false,
            drop_indexes_on_rebuild: true,
        }
    }
}

impl IngestConfig {
    pub fn lookup_strategy(&self) -> LookupStrategy {
        if self.use_index {
            LookupStrategy::IndexHint
        } else {
            LookupStrategy::DirectMatch
        }
    }
}

/// Which graph store to write to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    Sqlite {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    Neo4j {
        uri: String,
        #[serde(default = "default_neo4j_user")]
        user: String,
        #[serde(default)]
        password: String,
    },
}

fn default_neo4j_user() -> String {
    "neo4j".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite { path: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub ingest: IngestConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Get the default database path (~/.local/share/pubgraph/pubgraph.db)
pub fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("pubgraph").join("pubgraph.db")
}
