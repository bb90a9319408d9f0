//! pubgraph: bibliographic metadata to property graph
//!
//! Ingests line-delimited JSON publication records (works with their
//! authorships, concepts and host venues) and materializes them as a
//! property graph for co-authorship, affiliation and topical queries.
//!
//! # Core Concepts
//!
//! - **Nodes**: Work, Author, Institution, Concept and Venue, each unique by `id`
//! - **Relationships**: `AUTHORED`, `AFFILIATED_WITH` (accumulating the
//!   works that evidence it), `PUBLISHED_IN` and `ABOUT` (with confidence)
//! - **Stores**: any `GraphStore`; SQLite is built in, Neo4j behind the
//!   `neo4j` feature
//!
//! # Example
//!
//! ```
//! use pubgraph::{IngestConfig, Ingestor, OpenStore, SqliteStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteStore::open_in_memory().unwrap());
//! let ingestor = Ingestor::new(store, IngestConfig::default());
//! // ingestor.ingest_file("works.jsonl").await
//! ```

pub mod config;
pub mod graph;
pub mod ingest;
pub mod storage;

pub use config::{Config, ConfigError, IngestConfig, StoreConfig};
pub use graph::{
    Label, MergeOutcome, NodeRef, NodeWrite, Properties, PropertiesBuilder, PropertyValue,
    RelType, Relationship, RelationshipWrite, CONFIDENCE, IDENTITY_PROPERTY, POSITION, THROUGH_WORKS,
};
pub use ingest::{IngestError, IngestReport, IngestResult, Ingestor};
pub use storage::{GraphStore, IndexInfo, LookupStrategy, OpenStore, SqliteStore, StorageError, StorageResult};
#[cfg(feature = "neo4j")]
pub use storage::Neo4jStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
