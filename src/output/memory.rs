//! In-memory sink for embedding and tests

use crate::output::stats::HarvestSummary;
use crate::output::traits::{BatchSink, OutputResult};
use crate::product::ProductRecord;
use std::sync::{Arc, Mutex, MutexGuard};

/// Keeps every batch in memory, in delivery order
///
/// Clones share storage, so a caller can keep one handle while the
/// orchestrator owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<Vec<ProductRecord>>>>,
    summary: Arc<Mutex<Option<HarvestSummary>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches delivered so far
    pub fn batches(&self) -> Vec<Vec<ProductRecord>> {
        lock(&self.batches).clone()
    }

    /// All delivered records, flattened in delivery order
    pub fn records(&self) -> Vec<ProductRecord> {
        lock(&self.batches).iter().flatten().cloned().collect()
    }

    /// The summary passed to `finalize`, once the run has ended
    pub fn summary(&self) -> Option<HarvestSummary> {
        lock(&self.summary).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl BatchSink for MemorySink {
    fn push_batch(&mut self, batch: &[ProductRecord]) -> OutputResult<()> {
        lock(&self.batches).push(batch.to_vec());
        Ok(())
    }

    fn finalize(&mut self, summary: &HarvestSummary) -> OutputResult<()> {
        *lock(&self.summary) = Some(summary.clone());
        Ok(())
    }
}
