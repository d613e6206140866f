use thiserror::Error;

/// Failures surfaced by the extraction pipeline. Every variant's message is
/// what gets persisted on the failed document and job rows.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No text extracted from document")]
    EmptyText,

    #[error("Extraction timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Document is already being processed")]
    AlreadyProcessing,

    #[error("Extraction task panicked: {0}")]
    TaskPanicked(String),

    #[error("Extraction failed: {0}")]
    Extract(#[from] crate::error::ExtractError),

    #[error("Storage failed: {0}")]
    Storage(#[from] crate::error::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}
