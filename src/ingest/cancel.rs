//! Cooperative cancellation for ingestion runs
//!
//! The caller signals via a cancellation token. Writers check the token
//! between item writes. Items already written stay written.

use super::error::{IngestError, IngestResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation token.
///
/// Cancellation during a write has no effect until the next check.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Fail with `IngestError::Cancelled` if cancellation was requested.
    pub fn check(&self, phase: &'static str) -> IngestResult<()> {
        if self.is_cancelled() {
            Err(IngestError::Cancelled { phase })
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
