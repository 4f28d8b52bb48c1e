//! Session tracker
//!
//! Pure counters with no I/O. The coordinator reports exactly one fetch event
//! per page (after retries are resolved) and exactly one ingest event per
//! extracted record.

use crate::session::SessionStats;
use crate::storage::IngestResult;
use std::time::{Duration, Instant};

/// Final outcome of fetching one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchEvent {
    Success,
    Blocked,
    TransientError,
    FatalError,
}

/// Outcome of ingesting one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestEvent {
    Added,
    Duplicate,
    Failed,
}

impl From<&IngestResult> for IngestEvent {
    fn from(result: &IngestResult) -> Self {
        match result {
            IngestResult::Added { .. } => Self::Added,
            IngestResult::Duplicate => Self::Duplicate,
        }
    }
}

/// Aggregates fetch and ingest events for one session
#[derive(Debug)]
pub struct SessionTracker {
    stats: SessionStats,
    started: Instant,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            stats: SessionStats::default(),
            started: Instant::now(),
        }
    }

    pub fn record_fetch(&mut self, event: FetchEvent) {
        self.stats.pages_attempted += 1;
        match event {
            FetchEvent::Success => self.stats.pages_fetched += 1,
            FetchEvent::Blocked => self.stats.blocked_count += 1,
            FetchEvent::TransientError | FetchEvent::FatalError => self.stats.fetch_errors += 1,
        }
    }

    pub fn record_ingest(&mut self, event: IngestEvent) {
        self.stats.records_seen += 1;
        match event {
            IngestEvent::Added => self.stats.records_added += 1,
            IngestEvent::Duplicate => self.stats.duplicates_skipped += 1,
            IngestEvent::Failed => self.stats.record_errors += 1,
        }
    }

    /// A page was fetched but its records could not be extracted
    pub fn record_page_error(&mut self) {
        self.stats.page_errors += 1;
    }

    /// Snapshot of the counters
    pub fn summary(&self) -> SessionStats {
        self.stats
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracker_is_zeroed() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.summary(), SessionStats::default());
        assert_eq!(tracker.summary().errors(), 0);
    }

    #[test]
    fn test_fetch_events_count_once_per_page() {
        let mut tracker = SessionTracker::new();

        tracker.record_fetch(FetchEvent::Success);
        tracker.record_fetch(FetchEvent::Success);
        tracker.record_fetch(FetchEvent::Blocked);
        tracker.record_fetch(FetchEvent::TransientError);
        tracker.record_fetch(FetchEvent::FatalError);

        let stats = tracker.summary();
        assert_eq!(stats.pages_attempted, 5);
        assert_eq!(stats.pages_fetched, 2);
        assert_eq!(stats.blocked_count, 1);
        assert_eq!(stats.fetch_errors, 2);
        assert_eq!(stats.errors(), 2);
    }

    #[test]
    fn test_ingest_events() {
        let mut tracker = SessionTracker::new();

        tracker.record_ingest(IngestEvent::from(&IngestResult::Added { quote_id: 1 }));
        tracker.record_ingest(IngestEvent::from(&IngestResult::Duplicate));
        tracker.record_ingest(IngestEvent::Failed);
        tracker.record_page_error();

        let stats = tracker.summary();
        assert_eq!(stats.records_seen, 3);
        assert_eq!(stats.records_added, 1);
        assert_eq!(stats.duplicates_skipped, 1);
        assert_eq!(stats.record_errors, 1);
        assert_eq!(stats.page_errors, 1);
        assert_eq!(stats.errors(), 2);
    }
}
