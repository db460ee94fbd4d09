//! Crawler module for fetching and orchestrating a harvest run
//!
//! This module contains the core harvesting logic, including:
//! - The fetch capability with an HTTP implementation and retry policy
//! - Request descriptors for list and detail pages
//! - The orchestrator with its sequential and worker-pool models

mod coordinator;
mod fetcher;
mod pool;
mod request;

pub use coordinator::Orchestrator;
pub use fetcher::{build_http_client, with_retry, FetchResponse, Fetcher, HttpFetcher, RetryPolicy};
pub use request::{FetchRequest, RequestFactory, RequestKind};

use crate::config::{Config, HarvestInput};
use crate::output::{BatchSink, HarvestSummary};
use crate::Result;
use std::sync::Arc;

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Resolve the input section into concrete limits
/// 2. Page through search results until a stop condition holds
/// 3. Enrich, deduplicate and batch records into `sink`
/// 4. Finalize the sink with the run summary
///
/// # Example
///
/// ```no_run
/// use listing_harvest::config::Config;
/// use listing_harvest::crawler::{harvest, HttpFetcher};
/// use listing_harvest::output::MemorySink;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let fetcher = HttpFetcher::new(&config.crawler, None)?;
/// let mut sink = MemorySink::new();
/// let summary = harvest(config, Arc::new(fetcher), &mut sink).await?;
/// println!("saved {}", summary.saved);
/// # Ok(())
/// # }
/// ```
pub async fn harvest<S: BatchSink + ?Sized>(
    config: Config,
    fetcher: Arc<dyn Fetcher>,
    sink: &mut S,
) -> Result<HarvestSummary> {
    let input = HarvestInput::from_config(&config.input);
    Orchestrator::new(config, input, fetcher)?.run(sink).await
}
