//! Bulk node loader
//!
//! Submits entities of one label in chunks, one store call per chunk.
//! Nodes only: relationships, and `AFFILIATED_WITH` in particular, always go
//! through the per-item writer so that merges accumulate in order.

use super::cancel::CancellationToken;
use super::entity::Identified;
use super::error::IngestResult;
use super::writer::WriteTally;
use crate::graph::Properties;
use crate::storage::GraphStore;
use tracing::{debug, warn};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

pub struct BatchLoader<'a> {
    store: &'a dyn GraphStore,
    chunk_size: usize,
    cancel: CancellationToken,
}

impl<'a> BatchLoader<'a> {
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self {
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel: CancellationToken::new(),
        }
    }

    /// Chunk size; zero is treated as one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Create one node per entity, `chunk_size` per statement.
    ///
    /// A failed chunk counts every entity in it as failed and loading
    /// continues with the next chunk; a fatal store error aborts.
    pub async fn load<T: Identified + Sync>(&self, entities: &[T]) -> IngestResult<WriteTally> {
        let mut tally = WriteTally::default();
        for chunk in entities.chunks(self.chunk_size) {
            self.cancel.check("bulk node load")?;
            tally.attempted += chunk.len();
            let rows: Vec<Properties> = chunk.iter().map(|e| e.to_node().properties).collect();
            match self.store.create_nodes(T::LABEL, &rows).await {
                Ok(created) => {
                    let created = created as usize;
                    tally.created += created;
                    tally.failed += chunk.len().saturating_sub(created);
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!(label = %T::LABEL, size = chunk.len(), error = %e, "bulk chunk failed, continuing");
                    tally.failed += chunk.len();
                }
            }
        }
        debug!(label = %T::LABEL, created = tally.created, chunks = entities.len().div_ceil(self.chunk_size), "bulk load done");
        Ok(tally)
    }
}
