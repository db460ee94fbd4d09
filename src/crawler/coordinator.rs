//! Harvest coordinator - main orchestration logic
//!
//! This module contains the control loop that drives a run:
//! - Building and fetching list pages with retry
//! - Normalizing and deduplicating candidates
//! - Enriching records from their detail pages
//! - Batching records into the sink
//! - Evaluating stop conditions after every page
//!
//! The sequential model lives here; the worker-pool model is in `pool.rs`
//! and shares every helper below.

use crate::config::{validate, Config, HarvestInput, Strategy};
use crate::crawler::fetcher::{with_retry, FetchResponse, Fetcher, RetryPolicy};
use crate::crawler::request::{FetchRequest, RequestFactory, RequestKind};
use crate::extract::{extract_detail, extract_list, ListPage};
use crate::output::{BatchBuffer, BatchSink, HarvestSummary};
use crate::product::{normalize_candidate, normalize_detail, DetailFields, ProductRecord, RawCandidate};
use crate::state::{RunPhase, RunState, Session, StopReason};
use crate::{HarvestError, Result};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Drives one harvest run from the first list page to a terminal phase
pub struct Orchestrator {
    pub(super) config: Arc<Config>,
    pub(super) input: HarvestInput,
    pub(super) fetcher: Arc<dyn Fetcher>,
    pub(super) requests: RequestFactory,
    pub(super) retry: RetryPolicy,
    pub(super) state: RunState,
    buffer: BatchBuffer,
    batches: usize,
    failure: Option<String>,
    request_delay: Duration,
}

impl Orchestrator {
    /// Creates an orchestrator for one run
    ///
    /// # Arguments
    ///
    /// * `config` - Validated harvester configuration
    /// * `input` - Resolved run input (query, limits, detail toggle)
    /// * `fetcher` - Fetch capability used for every request
    pub fn new(config: Config, input: HarvestInput, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        validate(&config)?;

        let requests = RequestFactory::new(&config, &input.query)?;
        let retry = RetryPolicy::from_config(&config.crawler);
        let state = RunState::new(Session::new(), config.source.page_size);
        let request_delay = Duration::from_millis(config.crawler.request_delay_ms);

        Ok(Self {
            config: Arc::new(config),
            input,
            fetcher,
            requests,
            retry,
            state,
            buffer: BatchBuffer::new(),
            batches: 0,
            failure: None,
            request_delay,
        })
    }

    /// Replaces the generated session, e.g. to pin the visitor id
    pub fn with_session(mut self, session: Session) -> Self {
        self.state.session = session;
        self
    }

    /// Counters and phase of the run so far
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// The scheduling model this run will use
    pub fn strategy(&self) -> Strategy {
        self.config
            .crawler
            .effective_strategy(self.config.source.mode)
    }

    /// Runs the harvest to completion
    ///
    /// Always flushes buffered records and finalizes the sink, including
    /// when the list stage aborts. An aborted run is reported through the
    /// summary's `final_phase`, not as an error; errors are reserved for
    /// sink failures.
    pub async fn run<S: BatchSink + ?Sized>(mut self, sink: &mut S) -> Result<HarvestSummary> {
        let strategy = self.strategy();
        tracing::info!(
            "Harvesting '{}' ({} mode, {:?} strategy, target {}, max pages {}, details {})",
            self.input.query,
            self.config.source.mode,
            strategy,
            if self.input.is_unbounded() {
                "unbounded".to_string()
            } else {
                self.input.results_wanted.to_string()
            },
            self.input.max_pages,
            if self.input.collect_details { "on" } else { "off" }
        );

        match strategy {
            Strategy::Sequential => self.run_sequential(sink).await?,
            Strategy::Pool => self.run_pool(sink).await?,
        }

        self.flush(sink)?;

        let summary = HarvestSummary::from_state(&self.state, self.batches, self.failure.clone());
        sink.finalize(&summary)?;

        match summary.stop_reason {
            Some(reason) if summary.is_aborted() => tracing::error!(
                "Run aborted after {} saved products: {}",
                summary.saved,
                reason
            ),
            Some(reason) => tracing::info!(
                "Run finished with {} saved products ({})",
                summary.saved,
                reason
            ),
            None => tracing::info!("Run finished with {} saved products", summary.saved),
        }

        Ok(summary)
    }

    /// One page at a time; detail fetches awaited one by one
    async fn run_sequential<S: BatchSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        loop {
            let page = self.state.pagination.current_page;

            let list = match self.fetch_list_page(page).await {
                Ok(list) => list,
                Err(err) => {
                    self.fail_list(page, &err);
                    return Ok(());
                }
            };

            self.state.transition(RunPhase::Extract);
            self.record_list_page(page, &list);
            let page_was_empty = list.is_empty();

            for candidate in list.candidates {
                if self.state.saved >= self.input.results_wanted {
                    tracing::debug!("Target reached, discarding rest of page {}", page);
                    break;
                }

                let Some(record) = self.admit(candidate) else {
                    continue;
                };

                let record = if self.input.collect_details {
                    self.state.transition(RunPhase::Enrich);
                    let enriched = self.enrich(record).await;
                    self.pause().await;
                    enriched
                } else {
                    record
                };

                self.state.transition(RunPhase::Emit);
                self.emit(record, sink)?;
            }

            self.state.transition(RunPhase::AdvanceOrStop);
            if let Some(reason) = self.stop_condition(page, page_was_empty, self.state.saved) {
                tracing::info!("Stopping after page {}: {}", page, reason);
                self.state.finish(reason);
                return Ok(());
            }

            self.state.pagination.current_page = page + 1;
            self.state.transition(RunPhase::FetchList(page + 1));
            self.pause().await;
        }
    }

    async fn fetch_list_page(&self, page: u32) -> Result<ListPage> {
        fetch_list(
            self.fetcher.as_ref(),
            self.retry,
            &self.requests,
            &self.state.session,
            page,
        )
        .await
    }

    async fn enrich(&mut self, record: ProductRecord) -> ProductRecord {
        let result = match self.requests.detail_request(&record.url) {
            Ok(request) => {
                fetch_detail(
                    self.fetcher.as_ref(),
                    self.retry,
                    &request,
                    self.requests.origin(),
                )
                .await
            }
            Err(err) => Err(err.into()),
        };
        self.apply_detail(record, result)
    }

    /// Merges a detail result into its record; a failure keeps list fields
    pub(super) fn apply_detail(
        &mut self,
        record: ProductRecord,
        result: Result<DetailFields>,
    ) -> ProductRecord {
        match result {
            Ok(detail) => record.enrich(detail),
            Err(err) => {
                self.state.detail_failures += 1;
                tracing::warn!(
                    "Detail fetch failed for {}, keeping list fields: {}",
                    record.url,
                    err
                );
                record
            }
        }
    }

    /// Books a fetched list page into the run counters
    pub(super) fn record_list_page(&mut self, page: u32, list: &ListPage) {
        self.state.pages_fetched += 1;
        self.state.pagination.record_total(list.total_available);
        self.state.malformed += list.dropped;

        match self.state.pagination.total_pages() {
            Some(total) => tracing::info!(
                "LIST page {}/{} → found {} products",
                page,
                total,
                list.candidates.len()
            ),
            None => tracing::info!("LIST page {} → found {} products", page, list.candidates.len()),
        }
        if list.dropped > 0 {
            tracing::debug!("Dropped {} malformed entries on page {}", list.dropped, page);
        }
    }

    /// Ends the run after the list stage exhausted its retries
    pub(super) fn fail_list(&mut self, page: u32, err: &HarvestError) {
        tracing::error!("List page {} failed after retries: {}", page, err);
        self.failure = Some(err.to_string());
        self.state.finish(StopReason::ListFetchFailed);
    }

    /// Normalizes a candidate and checks it against the dedup set
    ///
    /// Returns `None` for malformed candidates and repeats, counting each.
    pub(super) fn admit(&mut self, candidate: RawCandidate) -> Option<ProductRecord> {
        let href = candidate.href().map(str::to_string);

        let Some(record) = normalize_candidate(candidate, self.requests.origin()) else {
            self.state.malformed += 1;
            tracing::debug!("Dropped candidate without usable URL or title: {:?}", href);
            return None;
        };

        if !self.state.dedup.admit(&record.url) {
            self.state.duplicates += 1;
            tracing::debug!("Skipping duplicate {}", record.url);
            return None;
        }

        Some(record)
    }

    /// Counts a finished record and hands it to the batch buffer
    pub(super) fn emit<S: BatchSink + ?Sized>(
        &mut self,
        record: ProductRecord,
        sink: &mut S,
    ) -> Result<()> {
        self.state.saved += 1;
        match self.buffer.push(record) {
            Some(batch) => self.push_batch(batch, sink),
            None => Ok(()),
        }
    }

    fn flush<S: BatchSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        tracing::debug!("Flushing {} buffered products", self.buffer.len());
        let rest = self.buffer.take();
        self.push_batch(rest, sink)
    }

    fn push_batch<S: BatchSink + ?Sized>(
        &mut self,
        batch: Vec<ProductRecord>,
        sink: &mut S,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        sink.push_batch(&batch)?;
        self.batches += 1;
        tracing::info!("Pushed {} products (total {})", batch.len(), self.state.saved);
        Ok(())
    }

    /// First satisfied stop condition after `page`, if any
    ///
    /// `produced` is what counts against the target: records saved, plus
    /// records waiting on detail fetches under the worker pool.
    pub(super) fn stop_condition(
        &self,
        page: u32,
        page_was_empty: bool,
        produced: usize,
    ) -> Option<StopReason> {
        if produced >= self.input.results_wanted {
            Some(StopReason::TargetReached)
        } else if page >= self.input.max_pages {
            Some(StopReason::PageCapReached)
        } else if page_was_empty {
            Some(StopReason::EmptyPage)
        } else if self.state.pagination.reached_total_pages() {
            Some(StopReason::TotalPagesReached)
        } else {
            None
        }
    }

    async fn pause(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }
}

/// Fetches and extracts one list page
///
/// The request is rebuilt for every attempt, so each retried search takes a
/// fresh session sequence number. A body that cannot be parsed is retried
/// the same way as a failed fetch.
pub(super) async fn fetch_list(
    fetcher: &dyn Fetcher,
    retry: RetryPolicy,
    requests: &RequestFactory,
    session: &Session,
    page: u32,
) -> Result<ListPage> {
    let mode = requests.mode();
    let what = RequestKind::List { page }.to_string();

    with_retry(retry, &what, move || async move {
        let request = requests.list_request(session, page)?;
        tracing::debug!("Fetching list page {}: {}", page, request.url);
        let response = fetcher.fetch(&request).await?;
        log_response(&what_of(&request), &response);
        Ok::<_, HarvestError>(extract_list(mode, &response.body)?)
    })
    .await
}

/// Fetches a detail page and extracts normalized detail fields
pub(super) async fn fetch_detail(
    fetcher: &dyn Fetcher,
    retry: RetryPolicy,
    request: &FetchRequest,
    origin: &Url,
) -> Result<DetailFields> {
    let what = what_of(request);
    let response = with_retry(retry, &what, move || fetcher.fetch(request)).await?;
    log_response(&what, &response);
    Ok(normalize_detail(extract_detail(&response.body), origin))
}

fn what_of(request: &FetchRequest) -> String {
    format!("{} {}", request.kind, request.url)
}

fn log_response(what: &str, response: &FetchResponse) {
    tracing::debug!(
        "{} → HTTP {}, {} bytes from {}",
        what,
        response.status,
        response.body.len(),
        response.final_url
    );
}
