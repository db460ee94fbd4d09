//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `Session`: anonymous visitor id and request sequence numbers
//! - `Deduplicator`: canonical URLs already admitted this run
//! - `PaginationState`: current page and upstream-reported totals
//! - `RunPhase` / `StopReason`: the orchestrator's state machine
//! - `RunState`: everything above plus run counters, owned by one orchestrator

mod run_phase;
mod run_state;
mod session;

// Re-export main types
pub use run_phase::{RunPhase, StopReason};
pub use run_state::{Deduplicator, PaginationState, RunState};
pub use session::Session;
