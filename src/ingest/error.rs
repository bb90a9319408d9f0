//! Errors that end an ingestion run

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that abort ingestion.
///
/// Per-item write failures never surface here; they are tallied in the
/// report instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cannot read input {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Ingestion cancelled during {phase}")]
    Cancelled { phase: &'static str },
}

/// Result type for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;
