//! JSON-lines sink
//!
//! Writes one JSON object per record per line and flushes after every
//! batch, so a crash never loses a batch that was already pushed.

use crate::output::stats::HarvestSummary;
use crate::output::traits::{BatchSink, OutputResult};
use crate::product::ProductRecord;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Sink writing newline-delimited JSON to any writer
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl JsonLinesSink<Box<dyn Write + Send>> {
    /// Opens `path` for writing; `"-"` writes to stdout
    ///
    /// An existing file is truncated.
    pub fn create(path: &str) -> OutputResult<Self> {
        let writer: Box<dyn Write + Send> = if path == "-" {
            Box::new(io::stdout())
        } else {
            Box::new(BufWriter::new(File::create(Path::new(path))?))
        };
        Ok(Self::new(writer))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of records written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> BatchSink for JsonLinesSink<W> {
    fn push_batch(&mut self, batch: &[ProductRecord]) -> OutputResult<()> {
        for record in batch {
            serde_json::to_writer(&mut self.writer, record)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        self.written += batch.len();
        Ok(())
    }

    fn finalize(&mut self, summary: &HarvestSummary) -> OutputResult<()> {
        self.writer.flush()?;
        tracing::debug!(
            "JSON lines output finalized: {} records ({} reported saved)",
            self.written,
            summary.saved
        );
        Ok(())
    }
}
