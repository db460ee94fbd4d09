//! Worker-pool scheduling
//!
//! List pages and detail pages share one FIFO queue. Up to
//! `max-concurrency` fetches are in flight at once; every completed fetch
//! comes back to the single aggregation loop below, which is the only code
//! that touches the dedup set, the counters and the batch buffer.

use crate::crawler::coordinator::{fetch_detail, fetch_list, Orchestrator};
use crate::extract::ListPage;
use crate::output::BatchSink;
use crate::product::{DetailFields, ProductRecord};
use crate::Result;
use futures::future::{self, BoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::collections::VecDeque;
use std::sync::Arc;

/// A unit of queued work
#[derive(Debug)]
pub(super) enum WorkItem {
    ListPage { page: u32 },
    Detail { record: ProductRecord },
}

/// What a worker hands back to the aggregation loop
enum WorkOutcome {
    ListPage {
        page: u32,
        result: Result<ListPage>,
    },
    Detail {
        record: ProductRecord,
        result: Result<DetailFields>,
    },
}

impl Orchestrator {
    pub(super) async fn run_pool<S: BatchSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        let width = self.config.crawler.max_concurrency.max(1) as usize;
        let mut queue: VecDeque<WorkItem> = VecDeque::from([WorkItem::ListPage { page: 1 }]);
        let mut in_flight: FuturesUnordered<BoxFuture<'static, WorkOutcome>> =
            FuturesUnordered::new();

        loop {
            while in_flight.len() < width {
                let Some(item) = queue.pop_front() else {
                    break;
                };
                in_flight.push(self.dispatch(item));
            }

            let Some(outcome) = in_flight.next().await else {
                break;
            };

            match outcome {
                WorkOutcome::ListPage {
                    page,
                    result: Ok(list),
                } => self.absorb_list_page(page, list, &mut queue, sink)?,
                WorkOutcome::ListPage {
                    page,
                    result: Err(err),
                } => self.fail_list(page, &err),
                WorkOutcome::Detail { record, result } => {
                    self.state.pending_details = self.state.pending_details.saturating_sub(1);
                    let record = self.apply_detail(record, result);
                    self.emit(record, sink)?;
                }
            }
        }

        Ok(())
    }

    /// Returns the future that performs `item`
    ///
    /// List workers get clones of the request factory and the session; both
    /// share their counters with the originals, so sequence numbers and proxy
    /// rotation stay run-wide while retries rebuild the request.
    fn dispatch(&self, item: WorkItem) -> BoxFuture<'static, WorkOutcome> {
        let fetcher = Arc::clone(&self.fetcher);
        let retry = self.retry;

        match item {
            WorkItem::ListPage { page } => {
                let requests = self.requests.clone();
                let session = self.state.session.clone();
                async move {
                    let result =
                        fetch_list(fetcher.as_ref(), retry, &requests, &session, page).await;
                    WorkOutcome::ListPage { page, result }
                }
                .boxed()
            }
            WorkItem::Detail { record } => {
                let origin = self.requests.origin().clone();
                match self.requests.detail_request(&record.url) {
                    Ok(request) => async move {
                        let result =
                            fetch_detail(fetcher.as_ref(), retry, &request, &origin).await;
                        WorkOutcome::Detail { record, result }
                    }
                    .boxed(),
                    Err(err) => future::ready(WorkOutcome::Detail {
                        record,
                        result: Err(err.into()),
                    })
                    .boxed(),
                }
            }
        }
    }

    /// Admits a page's candidates and decides whether to queue the next page
    ///
    /// Records waiting on detail fetches count against the target, so no
    /// detail fetch is ever queued past it.
    fn absorb_list_page<S: BatchSink + ?Sized>(
        &mut self,
        page: u32,
        list: ListPage,
        queue: &mut VecDeque<WorkItem>,
        sink: &mut S,
    ) -> Result<()> {
        self.state.pagination.current_page = page;
        self.record_list_page(page, &list);
        let page_was_empty = list.is_empty();

        for candidate in list.candidates {
            if self.state.committed() >= self.input.results_wanted {
                tracing::debug!("Target reached, discarding rest of page {}", page);
                break;
            }

            let Some(record) = self.admit(candidate) else {
                continue;
            };

            if self.input.collect_details {
                self.state.pending_details += 1;
                queue.push_back(WorkItem::Detail { record });
            } else {
                self.emit(record, sink)?;
            }
        }

        match self.stop_condition(page, page_was_empty, self.state.committed()) {
            Some(reason) => {
                tracing::info!(
                    "No more list pages after page {} ({}); {} detail fetches pending",
                    page,
                    reason,
                    self.state.pending_details
                );
                self.state.finish(reason);
            }
            None => queue.push_back(WorkItem::ListPage { page: page + 1 }),
        }

        Ok(())
    }
}
