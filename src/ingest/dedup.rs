//! Reduce entity collections to one entry per identifier

use super::entity::Identified;
use std::collections::HashSet;

/// Counts from one deduplication pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    /// Entities kept (distinct identifiers)
    pub kept: usize,
    /// Entities dropped because they carried no identifier
    pub missing_id: usize,
    /// Later occurrences of an identifier already kept
    pub duplicates: usize,
}

impl DedupStats {
    pub fn removed(&self) -> usize {
        self.missing_id + self.duplicates
    }
}

/// Keep the first occurrence of each identifier, preserving input order.
///
/// Entities without an identifier are dropped. Later occurrences are dropped
/// even when their attributes differ from the first one.
pub fn dedup_by_id<T: Identified>(items: Vec<T>) -> (Vec<T>, DedupStats) {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut stats = DedupStats::default();
    let mut kept = Vec::with_capacity(items.len());

    for item in items {
        let Some(id) = item.id() else {
            stats.missing_id += 1;
            continue;
        };
        if seen.insert(id.to_string()) {
            kept.push(item);
        } else {
            stats.duplicates += 1;
        }
    }

    stats.kept = kept.len();
    (kept, stats)
}
