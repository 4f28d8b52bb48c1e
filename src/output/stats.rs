//! Statistics reporting from the quote database
//!
//! This module provides functionality for extracting and displaying
//! store statistics and per-session summaries.

use crate::crawler::RunReport;
use crate::storage::{QuoteStore, StoreStats};
use crate::HarvestError;
use serde::Serialize;
use std::fmt::Write;

/// Store statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatistics {
    /// Row counts for authors, quotes and tags
    pub counts: StoreStats,

    /// Authors with the most quotes, descending
    pub top_authors: Vec<(String, u64)>,

    /// Most used tags, descending
    pub top_tags: Vec<(String, u64)>,

    /// Number of recorded scrape sessions
    pub session_count: u64,
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The store to query
/// * `top_n` - How many authors and tags to rank
pub fn load_statistics(store: &dyn QuoteStore, top_n: usize) -> Result<StoreStatistics, HarvestError> {
    Ok(StoreStatistics {
        counts: store.stats()?,
        top_authors: store.top_authors(top_n)?,
        top_tags: store.top_tags(top_n)?,
        session_count: store.count_sessions()?,
    })
}

/// Renders store statistics as console text
pub fn format_statistics(stats: &StoreStatistics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Quote Statistics ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Quotes: {}", stats.counts.quote_count);
    let _ = writeln!(out, "  Authors: {}", stats.counts.author_count);
    let _ = writeln!(out, "  Tags: {}", stats.counts.tag_count);
    let _ = writeln!(out, "  Scrape sessions: {}", stats.session_count);

    if !stats.top_authors.is_empty() {
        let _ = writeln!(out, "\nTop Authors:");
        for (rank, (name, count)) in stats.top_authors.iter().enumerate() {
            let _ = writeln!(out, "  {:>2}. {} ({} quotes)", rank + 1, name, count);
        }
    }

    if !stats.top_tags.is_empty() {
        let _ = writeln!(out, "\nTop Tags:");
        for (rank, (name, count)) in stats.top_tags.iter().enumerate() {
            let _ = writeln!(out, "  {:>2}. {} ({} uses)", rank + 1, name, count);
        }
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    print!("{}", format_statistics(stats));
}

/// Renders the summary of one finished session
pub fn format_session_summary(report: &RunReport) -> String {
    let stats = &report.stats;
    let mut out = String::new();

    let _ = writeln!(out, "=== Session {} Summary ===\n", report.session_id);
    let _ = writeln!(
        out,
        "Status: {} ({})",
        report.status.to_db_string(),
        report.stop_reason
    );
    let _ = writeln!(
        out,
        "Pages fetched: {} / {} attempted",
        stats.pages_fetched, stats.pages_attempted
    );
    let _ = writeln!(out, "Records seen: {}", stats.records_seen);
    let _ = writeln!(out, "Quotes added: {}", stats.records_added);
    let _ = writeln!(out, "Duplicates skipped: {}", stats.duplicates_skipped);
    let _ = writeln!(out, "Blocked pages: {}", stats.blocked_count);
    let _ = writeln!(
        out,
        "Errors: {} (fetch {}, record {}, page {})",
        stats.errors(),
        stats.fetch_errors,
        stats.record_errors,
        stats.page_errors
    );

    out
}

pub fn print_session_summary(report: &RunReport) {
    print!("{}", format_session_summary(report));
}
