//! Storage module for persisting scraped quotes
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Deduplicated upserts of authors and tags by natural key
//! - Quote ingestion with uniqueness enforcement on quote text
//! - Quote/tag association tracking
//! - Scrape session records and reporting queries

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{QuoteStore, StorageError, StorageResult};

use crate::HarvestError;
use serde::Serialize;
use std::path::Path;

/// Initializes or opens a quote store
pub fn open_store(path: &Path) -> Result<SqliteStore, HarvestError> {
    SqliteStore::new(path)
}

/// Outcome of ingesting one parsed record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestResult {
    /// A new quote row was created
    Added { quote_id: i64 },

    /// A quote with identical text already existed; nothing was written
    Duplicate,
}

impl IngestResult {
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added { .. })
    }
}

/// Row counts across the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub author_count: u64,
    pub quote_count: u64,
    pub tag_count: u64,
}

/// A quote joined with its author and tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredQuote {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub tags: Vec<String>,
    pub source_url: Option<String>,
    pub scraped_at: String,
}

/// Represents a scrape session
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: SessionStatus,
    pub pages_fetched: u64,
    pub records_added: u64,
    pub duplicates_skipped: u64,
    pub errors: u64,
}

/// Status of a scrape session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Completed,
    Interrupted,
    Aborted,
}

impl SessionStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Aborted => "aborted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }
}

/// Normalizes an author display name: trimmed, inner whitespace collapsed, case kept
pub fn normalize_author(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes a tag label: lowercase, whitespace runs replaced by hyphens
pub fn normalize_tag(label: &str) -> String {
    label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_parsing() {
        assert_eq!(
            SessionStatus::from_db_string("completed"),
            Some(SessionStatus::Completed)
        );
        assert_eq!(
            SessionStatus::from_db_string(SessionStatus::Aborted.to_db_string()),
            Some(SessionStatus::Aborted)
        );
        assert_eq!(SessionStatus::from_db_string("invalid"), None);
    }

    #[test]
    fn test_normalize_author() {
        assert_eq!(normalize_author("  Mark Twain "), "Mark Twain");
        assert_eq!(normalize_author("J.K.\n  Rowling"), "J.K. Rowling");
        assert_eq!(normalize_author("bell hooks"), "bell hooks");
        assert_eq!(normalize_author("   "), "");
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("Wisdom"), "wisdom");
        assert_eq!(normalize_tag(" be yourself "), "be-yourself");
        assert_eq!(normalize_tag("change-the-world"), "change-the-world");
        assert_eq!(normalize_tag(""), "");
    }
}
