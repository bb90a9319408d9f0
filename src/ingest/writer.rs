//! Graph writer: one item per store call, failures tallied per item
//!
//! Nodes are created one at a time and relationships merged one at a time,
//! sequentially. Order matters for `AFFILIATED_WITH`, whose merge must see
//! the effect of every earlier write to accumulate `through_works`.

use super::cancel::CancellationToken;
use super::entity::Identified;
use super::error::IngestResult;
use crate::graph::{MergeOutcome, RelationshipWrite};
use crate::storage::{GraphStore, LookupStrategy, StorageError};
use tracing::{debug, warn};

/// Per-kind write counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteTally {
    pub attempted: usize,
    pub created: usize,
    /// Existing relationship extended (list append)
    pub merged: usize,
    /// Existing relationship left as it was
    pub unchanged: usize,
    /// Relationship skipped because an endpoint node was absent
    pub missing_endpoint: usize,
    pub failed: usize,
}

impl WriteTally {
    fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Created => self.created += 1,
            MergeOutcome::Merged => self.merged += 1,
            MergeOutcome::Unchanged => self.unchanged += 1,
            MergeOutcome::MissingEndpoint => self.missing_endpoint += 1,
        }
    }

    /// Items that reached the store successfully
    pub fn succeeded(&self) -> usize {
        self.created + self.merged + self.unchanged
    }
}

impl std::ops::AddAssign for WriteTally {
    fn add_assign(&mut self, other: Self) {
        self.attempted += other.attempted;
        self.created += other.created;
        self.merged += other.merged;
        self.unchanged += other.unchanged;
        self.missing_endpoint += other.missing_endpoint;
        self.failed += other.failed;
    }
}

/// Absorb a per-item failure, or propagate it if the store is gone.
fn absorb(tally: &mut WriteTally, item: &dyn std::fmt::Display, e: StorageError) -> IngestResult<()> {
    if e.is_fatal() {
        return Err(e.into());
    }
    warn!(item = %item, error = %e, "write failed, continuing");
    tally.failed += 1;
    Ok(())
}

/// Writes entities and relationships using one lookup strategy
pub struct GraphWriter<'a> {
    store: &'a dyn GraphStore,
    lookup: LookupStrategy,
    cancel: CancellationToken,
}

impl<'a> GraphWriter<'a> {
    pub fn new(store: &'a dyn GraphStore, lookup: LookupStrategy) -> Self {
        Self {
            store,
            lookup,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Create one node per entity.
    pub async fn write_nodes<T: Identified + Sync>(&self, entities: &[T]) -> IngestResult<WriteTally> {
        let mut tally = WriteTally::default();
        for entity in entities {
            self.cancel.check("node population")?;
            tally.attempted += 1;
            let node = entity.to_node();
            match self.store.create_node(&node).await {
                Ok(()) => tally.created += 1,
                Err(e) => {
                    let item = format!("{}:{}", T::LABEL, entity.id().unwrap_or("?"));
                    absorb(&mut tally, &item, e)?;
                }
            }
        }
        debug!(label = %T::LABEL, created = tally.created, failed = tally.failed, "nodes written");
        Ok(tally)
    }

    /// Merge relationships in the given order.
    pub async fn write_relationships<I>(&self, writes: I) -> IngestResult<WriteTally>
    where
        I: IntoIterator<Item = RelationshipWrite>,
    {
        let mut tally = WriteTally::default();
        for write in writes {
            self.cancel.check("relationship writes")?;
            tally.attempted += 1;
            match self.store.merge_relationship(&write, self.lookup).await {
                Ok(outcome) => {
                    if outcome == MergeOutcome::MissingEndpoint {
                        debug!(relationship = %write, "endpoint missing, relationship skipped");
                    }
                    tally.record(outcome);
                }
                Err(e) => absorb(&mut tally, &write, e)?,
            }
        }
        Ok(tally)
    }
}
