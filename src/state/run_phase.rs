/// Run phase definitions for the harvest control loop
///
/// A run moves through `FetchList(page) -> Extract -> Enrich -> Emit ->
/// AdvanceOrStop` once per list page and ends in `Done` or `Aborted`.
use std::fmt;

/// Current phase of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    // ===== Active Phases =====
    /// Fetching the given list page
    FetchList(u32),

    /// Turning the fetched page into candidates
    Extract,

    /// Fetching detail pages for admitted candidates
    Enrich,

    /// Handing finished records to the batch buffer
    Emit,

    /// Evaluating stop conditions
    AdvanceOrStop,

    // ===== Terminal Phases =====
    /// A stop condition was satisfied
    Done,

    /// The list stage failed after exhausting retries
    Aborted,
}

impl RunPhase {
    /// Returns true if the run has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        use RunPhase::*;

        match (*self, next) {
            (FetchList(_), Extract) | (FetchList(_), Aborted) => true,
            (Extract, Enrich) | (Extract, Emit) | (Extract, AdvanceOrStop) => true,
            (Enrich, Emit) | (Enrich, Enrich) => true,
            (Emit, Enrich) | (Emit, Emit) | (Emit, AdvanceOrStop) => true,
            (AdvanceOrStop, FetchList(_)) | (AdvanceOrStop, Done) => true,
            _ => false,
        }
    }

    /// Converts the phase to its storage string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::FetchList(_) => "fetch_list",
            Self::Extract => "extract",
            Self::Enrich => "enrich",
            Self::Emit => "emit",
            Self::AdvanceOrStop => "advance_or_stop",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl Default for RunPhase {
    fn default() -> Self {
        Self::FetchList(1)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchList(page) => write!(f, "fetch_list({})", page),
            other => write!(f, "{}", other.to_db_string()),
        }
    }
}

/// Why a run stopped requesting list pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// Saved count reached the target
    TargetReached,
    /// The next page would exceed the configured page cap
    PageCapReached,
    /// The upstream returned a page without candidates
    EmptyPage,
    /// Every page the upstream reported has been requested
    TotalPagesReached,
    /// A list page could not be fetched or parsed
    ListFetchFailed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::TargetReached => "target count reached",
            Self::PageCapReached => "max pages reached",
            Self::EmptyPage => "page returned no products",
            Self::TotalPagesReached => "all upstream pages requested",
            Self::ListFetchFailed => "list page failed",
        };
        write!(f, "{}", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_phase() {
        assert_eq!(RunPhase::default(), RunPhase::FetchList(1));
    }

    #[test]
    fn test_is_terminal() {
        assert!(!RunPhase::FetchList(1).is_terminal());
        assert!(!RunPhase::Extract.is_terminal());
        assert!(!RunPhase::Enrich.is_terminal());
        assert!(!RunPhase::Emit.is_terminal());
        assert!(!RunPhase::AdvanceOrStop.is_terminal());

        assert!(RunPhase::Done.is_terminal());
        assert!(RunPhase::Aborted.is_terminal());
    }

    #[test]
    fn test_page_cycle_transitions() {
        assert!(RunPhase::FetchList(1).can_transition_to(RunPhase::Extract));
        assert!(RunPhase::Extract.can_transition_to(RunPhase::Enrich));
        assert!(RunPhase::Enrich.can_transition_to(RunPhase::Emit));
        assert!(RunPhase::Emit.can_transition_to(RunPhase::AdvanceOrStop));
        assert!(RunPhase::AdvanceOrStop.can_transition_to(RunPhase::FetchList(2)));
        assert!(RunPhase::AdvanceOrStop.can_transition_to(RunPhase::Done));
    }

    #[test]
    fn test_only_list_fetch_aborts() {
        assert!(RunPhase::FetchList(3).can_transition_to(RunPhase::Aborted));
        assert!(!RunPhase::Enrich.can_transition_to(RunPhase::Aborted));
        assert!(!RunPhase::Emit.can_transition_to(RunPhase::Aborted));
    }

    #[test]
    fn test_terminal_phases_are_final() {
        assert!(!RunPhase::Done.can_transition_to(RunPhase::FetchList(1)));
        assert!(!RunPhase::Aborted.can_transition_to(RunPhase::Done));
    }

    #[test]
    fn test_display() {
        assert_eq!(RunPhase::FetchList(4).to_string(), "fetch_list(4)");
        assert_eq!(RunPhase::Done.to_string(), "done");
        assert_eq!(StopReason::EmptyPage.to_string(), "page returned no products");
    }
}
