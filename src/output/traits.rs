//! Sink traits and types
//!
//! This module defines the capability every record destination implements
//! and the errors a destination can raise.

use crate::output::stats::HarvestSummary;
use crate::product::ProductRecord;
use thiserror::Error;

/// Errors that can occur while delivering records
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for finished product records
///
/// The orchestrator is the only caller. Batches arrive with at most ten
/// records each; every batch is independently deliverable, so a sink must
/// not rely on seeing the rest of the run.
pub trait BatchSink {
    /// Delivers one batch of records
    ///
    /// # Arguments
    ///
    /// * `batch` - The records to persist, in emission order
    fn push_batch(&mut self, batch: &[ProductRecord]) -> OutputResult<()>;

    /// Called once after the final batch, whether the run finished or aborted
    ///
    /// # Arguments
    ///
    /// * `summary` - Counters and final state of the run
    fn finalize(&mut self, summary: &HarvestSummary) -> OutputResult<()> {
        let _ = summary;
        Ok(())
    }
}

impl<S: BatchSink + ?Sized> BatchSink for Box<S> {
    fn push_batch(&mut self, batch: &[ProductRecord]) -> OutputResult<()> {
        (**self).push_batch(batch)
    }

    fn finalize(&mut self, summary: &HarvestSummary) -> OutputResult<()> {
        (**self).finalize(summary)
    }
}
