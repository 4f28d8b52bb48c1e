//! Session module for tracking one scrape run
//!
//! # Components
//!
//! - `SessionStats`: the per-run counters (pages, records, duplicates, errors)
//! - `SessionTracker`: the sole mutator of `SessionStats`, fed by fetch and ingest events
//! - `StopSignal`: a shared flag asking the run to stop after the current page

mod stats;
mod tracker;

pub use stats::SessionStats;
pub use tracker::{FetchEvent, IngestEvent, SessionTracker};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative "stop after the current page" request
///
/// Clones share the same flag, so the CLI can keep one handle for its Ctrl-C
/// handler while the coordinator polls another between pages.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag; returns `false` when a stop had already been requested
    pub fn request_stop(&self) -> bool {
        !self.requested.swap(true, Ordering::SeqCst)
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_signal_is_shared_between_clones() {
        let signal = StopSignal::new();
        let handle = signal.clone();

        assert!(!signal.is_stop_requested());
        handle.request_stop();
        assert!(signal.is_stop_requested());
    }

    #[test]
    fn test_repeated_stop_request_is_reported() {
        let signal = StopSignal::new();

        assert!(signal.request_stop());
        assert!(!signal.clone().request_stop());
        assert!(signal.is_stop_requested());
    }
}
