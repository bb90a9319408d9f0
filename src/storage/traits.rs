//! Storage trait definitions

use crate::graph::{Label, MergeOutcome, NodeWrite, Properties, RelType, Relationship, RelationshipWrite};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("No index {0} to satisfy an index-assisted lookup")]
    MissingIndex(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether the error means the store itself can no longer be used.
    ///
    /// Fatal errors abort an ingestion run; everything else is charged to
    /// the single item being written.
    pub fn is_fatal(&self) -> bool {
        match self {
            StorageError::Unavailable(_) | StorageError::Io(_) => true,
            StorageError::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::CannotOpen
                    | rusqlite::ErrorCode::NotADatabase
                    | rusqlite::ErrorCode::DatabaseCorrupt
                    | rusqlite::ErrorCode::SystemIoFailure
                    | rusqlite::ErrorCode::DiskFull
            ),
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// How relationship writes locate their endpoint nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupStrategy {
    /// Hint the identifier index for each endpoint; the index must exist
    #[default]
    IndexHint,
    /// Plain equality match on the identifier property
    DirectMatch,
}

impl LookupStrategy {
    pub fn uses_index(&self) -> bool {
        matches!(self, LookupStrategy::IndexHint)
    }
}

/// A secondary index as reported by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub label: Option<String>,
    pub properties: Vec<String>,
}

impl IndexInfo {
    /// Whether this index covers `property` on nodes labelled `label`
    pub fn covers(&self, label: Label, property: &str) -> bool {
        self.label.as_deref() == Some(label.as_str()) && self.properties.iter().any(|p| p == property)
    }
}

/// Trait for graph storage backends
///
/// Every method is one round-trip to the store and individually atomic.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait GraphStore: Send + Sync {
    // === Node Operations ===

    /// Create a node (no identity check; callers deduplicate)
    async fn create_node(&self, node: &NodeWrite) -> StorageResult<()>;

    /// Create many nodes of one label in a single statement
    ///
    /// Returns the number of nodes created.
    async fn create_nodes(&self, label: Label, nodes: &[Properties]) -> StorageResult<u64>;

    /// Count all nodes
    async fn count_nodes(&self) -> StorageResult<u64>;

    /// Count nodes carrying `label`
    async fn count_nodes_with_label(&self, label: Label) -> StorageResult<u64>;

    /// Remove every node and relationship. Indexes survive.
    async fn clear(&self) -> StorageResult<()>;

    // === Index Operations ===

    async fn list_indexes(&self) -> StorageResult<Vec<IndexInfo>>;

    /// Create an index named `name` on `label.property`
    async fn create_index(&self, name: &str, label: Label, property: &str) -> StorageResult<()>;

    async fn drop_index(&self, name: &str) -> StorageResult<()>;

    // === Relationship Operations ===

    /// Merge one relationship, creating it or accumulating into the existing edge
    async fn merge_relationship(
        &self,
        write: &RelationshipWrite,
        lookup: LookupStrategy,
    ) -> StorageResult<MergeOutcome>;

    /// Count relationships, optionally of a single type
    async fn count_relationships(&self, rel_type: Option<RelType>) -> StorageResult<u64>;

    /// Read back all relationships of a type
    async fn relationships(&self, rel_type: RelType) -> StorageResult<Vec<Relationship>>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: GraphStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
