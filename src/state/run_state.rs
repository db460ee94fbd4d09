use crate::state::run_phase::{RunPhase, StopReason};
use crate::state::session::Session;
use std::collections::HashSet;

/// Set of canonical product URLs already admitted in this run
///
/// The first sighting of a URL wins; every later sighting is rejected.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url` and returns true on first sight, false on repeats
    ///
    /// Check and insert are one operation, so a URL can be admitted at most once.
    pub fn admit(&mut self, url: &str) -> bool {
        self.seen.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Pagination bookkeeping owned by the orchestrator
#[derive(Debug, Clone)]
pub struct PaginationState {
    /// Page currently being processed (1-based)
    pub current_page: u32,

    /// Total results reported by the upstream, once known
    pub total_available: Option<u64>,

    /// Results requested per page, used to derive `total_pages`
    pub page_size: u32,
}

impl PaginationState {
    pub fn new(page_size: u32) -> Self {
        Self {
            current_page: 1,
            total_available: None,
            page_size: page_size.max(1),
        }
    }

    /// Records the upstream's total; the latest report is authoritative
    pub fn record_total(&mut self, total: Option<u64>) {
        if total.is_some() {
            self.total_available = total;
        }
    }

    /// Total pages derived from the reported total and the requested page size
    pub fn total_pages(&self) -> Option<u32> {
        self.total_available.map(|total| {
            let pages = total.div_ceil(u64::from(self.page_size));
            u32::try_from(pages).unwrap_or(u32::MAX)
        })
    }

    /// Returns true if `current_page` is the last page the upstream has
    pub fn reached_total_pages(&self) -> bool {
        self.total_pages()
            .is_some_and(|total| self.current_page >= total)
    }
}

/// Mutable run-wide state: identity, dedup set, counters and pagination
///
/// Owned by a single orchestrator; under the worker-pool model it is only
/// touched by the aggregation loop, never by workers.
#[derive(Debug)]
pub struct RunState {
    pub session: Session,
    pub dedup: Deduplicator,
    pub pagination: PaginationState,
    pub phase: RunPhase,
    pub stop_reason: Option<StopReason>,

    /// Records handed to the batch buffer
    pub saved: usize,

    /// Records admitted and waiting on a detail fetch
    pub pending_details: usize,

    pub pages_fetched: u32,
    pub duplicates: usize,
    pub malformed: usize,
    pub detail_failures: usize,
}

impl RunState {
    pub fn new(session: Session, page_size: u32) -> Self {
        Self {
            session,
            dedup: Deduplicator::new(),
            pagination: PaginationState::new(page_size),
            phase: RunPhase::default(),
            stop_reason: None,
            saved: 0,
            pending_details: 0,
            pages_fetched: 0,
            duplicates: 0,
            malformed: 0,
            detail_failures: 0,
        }
    }

    /// Saved plus in-flight records; what counts against the target
    pub fn committed(&self) -> usize {
        self.saved + self.pending_details
    }

    /// Moves to `next`, logging transitions the state machine does not expect
    pub fn transition(&mut self, next: RunPhase) {
        if !self.phase.can_transition_to(next) {
            tracing::warn!("Unexpected phase transition: {} -> {}", self.phase, next);
        }
        tracing::trace!("Phase {} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Ends the run in `Done` or `Aborted` with the given reason
    ///
    /// The first reason recorded is kept.
    pub fn finish(&mut self, reason: StopReason) {
        let terminal = if reason == StopReason::ListFetchFailed {
            RunPhase::Aborted
        } else {
            RunPhase::Done
        };
        if !self.phase.is_terminal() {
            tracing::trace!("Phase {} -> {}", self.phase, terminal);
            self.phase = terminal;
        }
        self.stop_reason.get_or_insert(reason);
    }
}
