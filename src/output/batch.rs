//! Fixed-size batch buffer between the orchestrator and the sink

use crate::product::ProductRecord;

/// Number of records per batch
pub const BATCH_SIZE: usize = 10;

/// Accumulates records and releases them in batches of [`BATCH_SIZE`]
///
/// Memory use is bounded by the threshold: a batch is released as soon as
/// the buffer fills, and the remainder is taken once the run ends.
#[derive(Debug)]
pub struct BatchBuffer {
    records: Vec<ProductRecord>,
    threshold: usize,
}

impl BatchBuffer {
    pub fn new() -> Self {
        Self::with_threshold(BATCH_SIZE)
    }

    /// Creates a buffer that releases every `threshold` records
    pub fn with_threshold(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            records: Vec::with_capacity(threshold),
            threshold,
        }
    }

    /// Adds a record; returns a full batch once the threshold is reached
    pub fn push(&mut self, record: ProductRecord) -> Option<Vec<ProductRecord>> {
        self.records.push(record);
        if self.records.len() >= self.threshold {
            Some(self.take())
        } else {
            None
        }
    }

    /// Takes whatever is buffered, possibly nothing
    pub fn take(&mut self) -> Vec<ProductRecord> {
        std::mem::replace(&mut self.records, Vec::with_capacity(self.threshold))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for BatchBuffer {
    fn default() -> Self {
        Self::new()
    }
}
