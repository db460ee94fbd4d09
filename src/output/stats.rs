//! Run summary
//!
//! Counters collected by the orchestrator, handed to the sink on finalize
//! and printed by the CLI.

use crate::state::{RunPhase, RunState, StopReason};
use crate::HarvestError;

/// Final counters and state of a harvest run
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestSummary {
    pub final_phase: RunPhase,
    pub stop_reason: Option<StopReason>,

    /// Last list page the run worked on
    pub last_page: u32,

    pub pages_fetched: u32,

    /// Records handed to the sink
    pub saved: usize,

    pub duplicates: usize,

    /// Candidates dropped for lacking a URL or a title
    pub malformed: usize,

    /// Records emitted with list fields only after their detail fetch failed
    pub detail_failures: usize,

    pub batches: usize,

    /// Total results the upstream reported, if it reported one
    pub total_available: Option<u64>,

    /// Why the list stage gave up, for aborted runs
    pub failure: Option<String>,
}

impl HarvestSummary {
    /// Builds a summary from the orchestrator's run state
    pub fn from_state(state: &RunState, batches: usize, failure: Option<String>) -> Self {
        Self {
            final_phase: state.phase,
            stop_reason: state.stop_reason,
            last_page: state.pagination.current_page,
            pages_fetched: state.pages_fetched,
            saved: state.saved,
            duplicates: state.duplicates,
            malformed: state.malformed,
            detail_failures: state.detail_failures,
            batches,
            total_available: state.pagination.total_available,
            failure,
        }
    }

    /// Returns true if the run ended because the list stage failed
    pub fn is_aborted(&self) -> bool {
        self.final_phase == RunPhase::Aborted
    }

    /// The run-level error for an aborted run
    pub fn abort_error(&self) -> Option<HarvestError> {
        self.is_aborted().then(|| HarvestError::Aborted {
            page: self.last_page,
            reason: self
                .failure
                .clone()
                .unwrap_or_else(|| "list fetch failed".to_string()),
        })
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &HarvestSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Outcome:");
    println!("  Final phase: {}", summary.final_phase);
    match summary.stop_reason {
        Some(reason) => println!("  Stop reason: {}", reason),
        None => println!("  Stop reason: -"),
    }
    if let Some(failure) = &summary.failure {
        println!("  Failure: {}", failure);
    }
    println!();

    println!("Pages:");
    println!("  List pages fetched: {}", summary.pages_fetched);
    if let Some(total) = summary.total_available {
        println!("  Results reported upstream: {}", total);
    }
    println!();

    println!("Records:");
    println!("  Saved: {} in {} batch(es)", summary.saved, summary.batches);
    println!("  Duplicates skipped: {}", summary.duplicates);
    println!("  Malformed candidates: {}", summary.malformed);
    println!("  Detail failures: {}", summary.detail_failures);
}
