//! Storage backends for pubgraph
//!
//! Every backend implements the async `GraphStore` trait. `SqliteStore` is
//! the embedded default; `Neo4jStore` talks to a Neo4j server and is only
//! built with the `neo4j` feature.

#[cfg(feature = "neo4j")]
mod neo4j;
mod sqlite;
mod traits;

#[cfg(feature = "neo4j")]
pub use neo4j::Neo4jStore;
pub use sqlite::SqliteStore;
pub use traits::{GraphStore, IndexInfo, LookupStrategy, OpenStore, StorageError, StorageResult};
