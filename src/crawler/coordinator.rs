//! Scrape coordinator - main pagination loop
//!
//! This module drives one scrape session:
//! - Opening and closing the persisted session record
//! - Walking listing pages from the start URL
//! - Handing fetched pages to the extractor and records to the store
//! - Feeding every outcome to the session tracker
//! - Deciding when to stop

use crate::config::{Config, PAGE_PLACEHOLDER};
use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::crawler::parser::{QuoteExtractor, QuoteRecord, RecordExtractor};
use crate::session::{IngestEvent, SessionStats, SessionTracker, StopSignal};
use crate::storage::{QuoteStore, SessionStatus};
use crate::Result;
use std::collections::HashSet;
use std::fmt;
use url::Url;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The extractor reported no further page
    EndOfPagination,
    /// The configured page bound was hit
    MaxPagesReached,
    /// A stop was requested between pages
    StopRequested,
    /// A page stayed blocked after all retries
    Blocked,
    /// A page failed with a non-retryable error
    Fatal,
    /// A page was skipped and no successor URL could be derived
    NoSuccessor,
    /// Pagination pointed back at a page already visited in this session
    RevisitedPage,
}

impl StopReason {
    pub fn session_status(&self) -> SessionStatus {
        match self {
            StopReason::EndOfPagination | StopReason::MaxPagesReached | StopReason::RevisitedPage => {
                SessionStatus::Completed
            }
            StopReason::StopRequested => SessionStatus::Interrupted,
            StopReason::Blocked | StopReason::Fatal | StopReason::NoSuccessor => {
                SessionStatus::Aborted
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::EndOfPagination => "end of pagination",
            StopReason::MaxPagesReached => "max pages reached",
            StopReason::StopRequested => "stop requested",
            StopReason::Blocked => "blocked",
            StopReason::Fatal => "fatal fetch error",
            StopReason::NoSuccessor => "no successor page",
            StopReason::RevisitedPage => "revisited page",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one scrape session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub session_id: i64,
    pub stop_reason: StopReason,
    pub status: SessionStatus,
    pub stats: SessionStats,
}

enum PageStep {
    Continue(String),
    Stop(StopReason),
}

/// Main scrape coordinator structure
pub struct Coordinator<S: QuoteStore> {
    fetcher: Fetcher,
    extractor: Box<dyn RecordExtractor>,
    store: S,
    tracker: SessionTracker,
    start_url: String,
    page_url_template: Option<String>,
    max_pages: u32,
    stop: StopSignal,
    config_hash: String,
}

impl<S: QuoteStore> Coordinator<S> {
    pub fn new(
        fetcher: Fetcher,
        extractor: Box<dyn RecordExtractor>,
        store: S,
        start_url: impl Into<String>,
        max_pages: u32,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            store,
            tracker: SessionTracker::new(),
            start_url: start_url.into(),
            page_url_template: None,
            max_pages,
            stop: StopSignal::new(),
            config_hash: String::new(),
        }
    }

    /// Creates a coordinator over the reqwest transport and the CSS extractor
    pub fn from_config(config: &Config, config_hash: impl Into<String>, store: S) -> Result<Self> {
        let fetcher = Fetcher::from_config(config)?;
        let extractor = QuoteExtractor::new(&config.extractor)?;

        Ok(Self::new(
            fetcher,
            Box::new(extractor),
            store,
            config.scraper.start_url.clone(),
            config.scraper.max_pages,
        )
        .with_page_template(config.scraper.page_url_template.clone())
        .with_config_hash(config_hash))
    }

    /// Template (containing `{page}`) used to derive the page after a skipped one
    pub fn with_page_template(mut self, template: Option<String>) -> Self {
        self.page_url_template = template;
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs one scrape session to completion
    ///
    /// Page-level failures end the session but are reported through the
    /// returned `RunReport`; only failing to open the session record is an
    /// error.
    pub async fn run(&mut self) -> Result<RunReport> {
        self.tracker = SessionTracker::new();
        let session_id = self.store.start_session(&self.config_hash)?;
        tracing::info!(
            "Starting scrape session {} at {} (max {} pages)",
            session_id,
            self.start_url,
            self.max_pages
        );

        let stop_reason = self.walk_pages().await;
        let stats = self.tracker.summary();
        let status = stop_reason.session_status();

        if let Err(e) = self.store.finish_session(session_id, &stats, status) {
            tracing::error!("Failed to record end of session {}: {}", session_id, e);
        }

        tracing::info!(
            "Session {} finished ({}): {} pages fetched, {} added, {} duplicates, {} errors in {:?}",
            session_id,
            stop_reason,
            stats.pages_fetched,
            stats.records_added,
            stats.duplicates_skipped,
            stats.errors(),
            self.tracker.elapsed()
        );

        Ok(RunReport {
            session_id,
            stop_reason,
            status,
            stats,
        })
    }

    async fn walk_pages(&mut self) -> StopReason {
        let mut visited = HashSet::new();
        let mut current = self.start_url.clone();
        let mut page_number: u32 = 1;

        loop {
            if !visited.insert(current.clone()) {
                tracing::warn!("Pagination returned to {}, stopping", current);
                return StopReason::RevisitedPage;
            }

            tracing::info!("Fetching page {}: {}", page_number, current);
            let outcome = self.fetcher.fetch(&current).await;
            self.tracker.record_fetch(outcome.kind());

            let next = match self.handle_outcome(outcome, &current, page_number) {
                PageStep::Continue(next) => next,
                PageStep::Stop(reason) => return reason,
            };

            if self.stop.is_stop_requested() {
                tracing::info!("Stop requested, ending session after page {}", page_number);
                return StopReason::StopRequested;
            }

            if page_number >= self.max_pages {
                tracing::info!("Reached page limit of {}", self.max_pages);
                return StopReason::MaxPagesReached;
            }

            current = next;
            page_number += 1;
        }
    }

    fn handle_outcome(&mut self, outcome: FetchOutcome, url: &str, page_number: u32) -> PageStep {
        match outcome {
            FetchOutcome::Success { body, .. } => self.process_page(url, &body, page_number),
            FetchOutcome::Blocked { status, reason } => {
                tracing::error!("Blocked on {} (HTTP {}): {}, aborting", url, status, reason);
                PageStep::Stop(StopReason::Blocked)
            }
            FetchOutcome::FatalError { cause } => {
                tracing::error!("Fatal error fetching {}: {}, aborting", url, cause);
                PageStep::Stop(StopReason::Fatal)
            }
            FetchOutcome::TransientError { cause } => {
                tracing::warn!("Skipping page {} ({}): {}", page_number, url, cause);
                self.skip_to_successor(url, page_number)
            }
        }
    }

    fn process_page(&mut self, url: &str, body: &str, page_number: u32) -> PageStep {
        let extracted = Url::parse(url)
            .map_err(|e| e.to_string())
            .and_then(|page_url| {
                self.extractor
                    .extract(body, &page_url)
                    .map_err(|e| e.to_string())
            });

        let page = match extracted {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("Failed to extract records from {}: {}", url, e);
                self.tracker.record_page_error();
                return self.skip_to_successor(url, page_number);
            }
        };

        tracing::debug!("Extracted {} records from {}", page.records.len(), url);
        for record in &page.records {
            self.ingest_record(record, url);
        }

        match page.next_page {
            Some(next) => PageStep::Continue(next),
            None => {
                tracing::info!("No next page after {}", url);
                PageStep::Stop(StopReason::EndOfPagination)
            }
        }
    }

    /// Stores one record; failures are counted and never stop the page
    fn ingest_record(&mut self, record: &QuoteRecord, source_url: &str) {
        match self
            .store
            .ingest_quote(&record.text, &record.author, &record.tags, Some(source_url))
        {
            Ok(result) => {
                tracing::debug!(
                    "{} quote by {}",
                    if result.is_added() { "Added" } else { "Duplicate" },
                    record.author
                );
                self.tracker.record_ingest(IngestEvent::from(&result));
            }
            Err(e) => {
                tracing::error!("Failed to store quote by '{}': {}", record.author, e);
                self.tracker.record_ingest(IngestEvent::Failed);
            }
        }
    }

    fn skip_to_successor(&self, failed_url: &str, page_number: u32) -> PageStep {
        match self.successor_url(failed_url, page_number) {
            Some(next) => {
                tracing::info!("Continuing with {} after skipping {}", next, failed_url);
                PageStep::Continue(next)
            }
            None => {
                tracing::error!(
                    "Cannot derive the page after {} without a page-url-template, stopping",
                    failed_url
                );
                PageStep::Stop(StopReason::NoSuccessor)
            }
        }
    }

    /// URL of the page after `failed_url`
    ///
    /// The page number is read back out of `failed_url` when it matches the
    /// template; the session's page counter is only used when it does not.
    fn successor_url(&self, failed_url: &str, page_number: u32) -> Option<String> {
        let template = self.page_url_template.as_ref()?;
        let (prefix, suffix) = template.split_once(PAGE_PLACEHOLDER)?;

        let current = page_number_in(failed_url, prefix, suffix).unwrap_or(page_number);
        let next = current.checked_add(1)?;

        Some(template.replace(PAGE_PLACEHOLDER, &next.to_string()))
    }
}

/// Page number embedded in `url` between the template's `prefix` and `suffix`
fn page_number_in(url: &str, prefix: &str, suffix: &str) -> Option<u32> {
    url.strip_prefix(prefix)?
        .strip_suffix(suffix)?
        .parse()
        .ok()
}
