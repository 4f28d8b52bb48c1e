use serde::Serialize;

/// Counters aggregated over one scrape session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Pages for which a fetch was attempted (one per page, not per retry)
    pub pages_attempted: u64,

    /// Pages fetched successfully
    pub pages_fetched: u64,

    /// Records handed to the store
    pub records_seen: u64,

    /// Records stored as new quotes
    pub records_added: u64,

    /// Records whose text was already stored
    pub duplicates_skipped: u64,

    /// Pages that ended in a transient or fatal fetch error
    pub fetch_errors: u64,

    /// Pages still blocked after all retries
    pub blocked_count: u64,

    /// Records the store failed to ingest
    pub record_errors: u64,

    /// Fetched pages whose content could not be extracted
    pub page_errors: u64,
}

impl SessionStats {
    /// Total failures of any kind, excluding blocks
    pub fn errors(&self) -> u64 {
        self.fetch_errors + self.record_errors + self.page_errors
    }
}
