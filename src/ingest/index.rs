//! Identifier indexes for every node label

use crate::graph::{Label, IDENTITY_PROPERTY};
use crate::storage::{GraphStore, StorageResult};
use tracing::{debug, info};

/// Result of ensuring identifier indexes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Labels that received a new index
    pub created: Vec<Label>,
    /// Labels already covered by an existing index
    pub existing: Vec<Label>,
}

/// Make sure every label has an index on its identifier property.
///
/// Existing indexes are inspected once; a label already covered (by any
/// index, whatever its name) is left alone.
pub async fn ensure_indexes(store: &dyn GraphStore) -> StorageResult<IndexReport> {
    let indexes = store.list_indexes().await?;
    let mut report = IndexReport::default();

    for label in Label::ALL {
        if indexes.iter().any(|i| i.covers(label, IDENTITY_PROPERTY)) {
            debug!(label = %label, "identifier index already present");
            report.existing.push(label);
            continue;
        }
        store
            .create_index(&label.index_name(), label, IDENTITY_PROPERTY)
            .await?;
        info!(label = %label, index = %label.index_name(), "created identifier index");
        report.created.push(label);
    }

    Ok(report)
}

/// Drop every index the store reports. Returns how many were dropped.
///
/// Used before a per-item rebuild so node inserts do not pay for index
/// maintenance; `ensure_indexes` restores them afterwards.
pub async fn drop_all_indexes(store: &dyn GraphStore) -> StorageResult<usize> {
    let indexes = store.list_indexes().await?;
    for index in &indexes {
        store.drop_index(&index.name).await?;
        debug!(index = %index.name, "dropped index");
    }
    Ok(indexes.len())
}
