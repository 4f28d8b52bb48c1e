//! Storage traits and error types
//!
//! This module defines the trait interface for quote store backends and
//! associated error types.

use crate::session::SessionStats;
use crate::storage::{IngestResult, SessionRecord, SessionStatus, StoreStats, StoredQuote};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Session not found: {0}")]
    SessionNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for deduplicating quote store backends
///
/// The store is the only component that assigns surrogate ids. Every write
/// must keep the natural-key uniqueness of authors (name), tags (label) and
/// quotes (text) intact even if several writers share the backend.
pub trait QuoteStore {
    // ===== Natural-key upserts =====

    /// Returns the id of the author with this name, creating the row on first use
    fn upsert_author(&mut self, name: &str) -> StorageResult<i64>;

    /// Returns the id of the tag with this label, creating the row on first use
    fn upsert_tag(&mut self, label: &str) -> StorageResult<i64>;

    // ===== Ingestion =====

    /// Ingests one parsed quote record
    ///
    /// Resolves the author, then inserts the quote and its tag links unless a
    /// quote with identical text already exists. Tags of an existing quote are
    /// never touched: the tag set seen at first ingestion wins.
    ///
    /// # Arguments
    ///
    /// * `text` - The full quote text (uniqueness key)
    /// * `author_name` - Display name of the author
    /// * `tag_labels` - Tag labels attached to the quote
    /// * `source_url` - Page the record was extracted from
    fn ingest_quote(
        &mut self,
        text: &str,
        author_name: &str,
        tag_labels: &[String],
        source_url: Option<&str>,
    ) -> StorageResult<IngestResult>;

    // ===== Reporting =====

    /// Counts authors, quotes and tags
    fn stats(&self) -> StorageResult<StoreStats>;

    /// Authors ordered by quote count descending, then name ascending
    fn top_authors(&self, n: usize) -> StorageResult<Vec<(String, u64)>>;

    /// Tags ordered by usage count descending, then label ascending
    fn top_tags(&self, n: usize) -> StorageResult<Vec<(String, u64)>>;

    /// All quotes, most recently scraped first
    fn all_quotes(&self) -> StorageResult<Vec<StoredQuote>>;

    /// Quotes whose author name contains `pattern`
    fn quotes_by_author(&self, pattern: &str) -> StorageResult<Vec<StoredQuote>>;

    /// Quotes carrying a tag whose label contains `pattern`
    fn quotes_by_tag(&self, pattern: &str) -> StorageResult<Vec<StoredQuote>>;

    /// Quotes whose text contains `keyword`
    fn search_quotes(&self, keyword: &str) -> StorageResult<Vec<StoredQuote>>;

    /// A uniformly chosen quote, if any exist
    fn random_quote(&self) -> StorageResult<Option<StoredQuote>>;

    /// Tag labels linked to a quote, sorted
    fn tags_for_quote(&self, quote_id: i64) -> StorageResult<Vec<String>>;

    // ===== Session Management =====

    /// Records the start of a scrape session
    fn start_session(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Stores the final statistics and status of a session
    fn finish_session(
        &mut self,
        session_id: i64,
        stats: &SessionStats,
        status: SessionStatus,
    ) -> StorageResult<()>;

    /// Gets a session by ID
    fn get_session(&self, session_id: i64) -> StorageResult<SessionRecord>;

    /// Counts recorded sessions
    fn count_sessions(&self) -> StorageResult<u64>;
}
