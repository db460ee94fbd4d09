//! Output module for delivering harvested records
//!
//! This module handles:
//! - The `BatchSink` capability and the 10-record batch buffer
//! - JSON-lines, SQLite and in-memory sinks
//! - The run summary handed to sinks and printed by the CLI

mod batch;
mod jsonl;
mod memory;
mod schema;
mod sqlite_output;
pub mod stats;
mod traits;

pub use batch::{BatchBuffer, BATCH_SIZE};
pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;
pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite_output::SqliteSink;
pub use stats::{print_summary, HarvestSummary};
pub use traits::{BatchSink, OutputError, OutputResult};

use crate::config::{OutputConfig, OutputFormat};
use std::path::Path;

/// Opens the sink described by the output configuration
///
/// # Arguments
///
/// * `config` - Output format and destination
/// * `config_hash` - Hash of the configuration, recorded by the SQLite sink
pub fn open_sink(config: &OutputConfig, config_hash: &str) -> OutputResult<Box<dyn BatchSink>> {
    let sink: Box<dyn BatchSink> = match config.format {
        OutputFormat::Jsonl => Box::new(JsonLinesSink::create(&config.path)?),
        OutputFormat::Sqlite => Box::new(SqliteSink::open(Path::new(&config.path), config_hash)?),
    };

    tracing::info!("Writing {:?} output to {}", config.format, config.path);
    Ok(sink)
}
