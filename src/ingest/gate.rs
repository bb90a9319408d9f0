//! Population gate: skip node writes when the store already holds this input

use crate::storage::GraphStore;
use tracing::{info, warn};

/// Outcome of the population check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The store holds exactly the expected number of nodes
    AlreadyPopulated { existing: u64 },
    /// The store must be wiped and rebuilt
    Repopulate { reason: RepopulateReason },
}

impl GateDecision {
    pub fn needs_population(&self) -> bool {
        matches!(self, GateDecision::Repopulate { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepopulateReason {
    /// Existing node count differs from the expected total
    CountMismatch { existing: u64, expected: u64 },
    /// The existing node count could not be read
    CountUnavailable(String),
    /// Rebuild requested regardless of store contents
    Forced,
}

impl std::fmt::Display for RepopulateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CountMismatch { existing, expected } => {
                write!(f, "store has {} nodes, expected {}", existing, expected)
            }
            Self::CountUnavailable(e) => write!(f, "node count unavailable: {}", e),
            Self::Forced => write!(f, "rebuild forced"),
        }
    }
}

/// Compare the store's node count against `expected`.
///
/// This is a coarse all-or-nothing check: equal counts are taken as
/// "populated" even if the contents differ.
pub async fn check_population(store: &dyn GraphStore, expected: u64, force: bool) -> GateDecision {
    if force {
        info!("population gate: rebuild forced");
        return GateDecision::Repopulate {
            reason: RepopulateReason::Forced,
        };
    }

    match store.count_nodes().await {
        Ok(existing) if existing == expected => {
            info!(existing, "population gate: store already populated");
            GateDecision::AlreadyPopulated { existing }
        }
        Ok(existing) => {
            let reason = RepopulateReason::CountMismatch { existing, expected };
            info!(%reason, "population gate: repopulating");
            GateDecision::Repopulate { reason }
        }
        Err(e) => {
            warn!(error = %e, "population gate: could not count nodes, repopulating");
            GateDecision::Repopulate {
                reason: RepopulateReason::CountUnavailable(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Label, NodeWrite, PropertiesBuilder};
    use crate::storage::{OpenStore, SqliteStore};

    async fn store_with(n: usize) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        for i in 0..n {
            let props = PropertiesBuilder::new().set("id", format!("W{}", i)).build();
            store.create_node(&NodeWrite::new(Label::Work, props)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn equal_counts_skip_population() {
        let store = store_with(3).await;
        let decision = check_population(&store, 3, false).await;
        assert_eq!(decision, GateDecision::AlreadyPopulated { existing: 3 });
        assert!(!decision.needs_population());
    }

    #[tokio::test]
    async fn mismatch_triggers_repopulation() {
        let store = store_with(2).await;
        let decision = check_population(&store, 3, false).await;
        assert_eq!(
            decision,
            GateDecision::Repopulate {
                reason: RepopulateReason::CountMismatch { existing: 2, expected: 3 }
            }
        );
    }

    #[tokio::test]
    async fn empty_store_and_empty_input_count_as_populated() {
        let store = store_with(0).await;
        assert!(!check_population(&store, 0, false).await.needs_population());
    }

    #[tokio::test]
    async fn force_overrides_matching_counts() {
        let store = store_with(3).await;
        let decision = check_population(&store, 3, true).await;
        assert_eq!(
            decision,
            GateDecision::Repopulate { reason: RepopulateReason::Forced }
        );
    }
}
