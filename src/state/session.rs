use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Per-run identity required by the search backend
///
/// Holds an anonymous visitor id (a random version-4 UUID) and a request
/// sequence number that is consumed once per outbound search request,
/// retries included. Clones share the sequence counter, so a worker holding
/// a clone never reuses a number.
#[derive(Debug, Clone)]
pub struct Session {
    visitor_id: String,
    sequence: Arc<AtomicU64>,
}

impl Session {
    /// Creates a session with a fresh visitor id
    pub fn new() -> Self {
        Self::with_visitor_id(Uuid::new_v4().to_string())
    }

    /// Creates a session with a known visitor id
    pub fn with_visitor_id(visitor_id: impl Into<String>) -> Self {
        Self {
            visitor_id: visitor_id.into(),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn visitor_id(&self) -> &str {
        &self.visitor_id
    }

    /// Returns the next sequence number; the first call returns 1
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number of sequence numbers handed out so far
    pub fn requests_issued(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
