//! Crawler module for resilient page fetching and ingestion
//!
//! This module contains the core scraping logic, including:
//! - Per-request identity, delay and backoff decisions
//! - A sliding-window cap on requests per minute
//! - HTTP fetching with retry logic and block detection
//! - HTML parsing into quote records
//! - Overall session coordination

mod coordinator;
mod detect;
mod fetcher;
mod parser;
mod policy;
mod throttle;

pub use coordinator::{Coordinator, RunReport, StopReason};
pub use detect::BlockDetector;
pub use fetcher::{
    build_http_client, FetchOutcome, Fetcher, HttpPageSource, NoopSleeper, PageSource,
    RawResponse, RetrySchedule, RetryStep, Sleeper, TokioSleeper, TransportError,
};
pub use parser::{ExtractError, ExtractedPage, QuoteExtractor, QuoteRecord, RecordExtractor};
pub use policy::{Identity, RequestPolicy};
pub use throttle::RateWindow;

use crate::config::Config;
use crate::session::StopSignal;
use crate::storage::open_store;
use crate::Result;
use std::path::Path;

/// Runs a complete scrape session
///
/// This is the main entry point for starting a scrape. It will:
/// 1. Open (or create) the quote database
/// 2. Build the HTTP transport, request policy and extractor
/// 3. Walk listing pages until pagination ends, a limit is hit, or a page fails terminally
/// 4. Persist the session record and return its report
///
/// # Arguments
///
/// * `config` - The scraper configuration
/// * `config_hash` - Hash of the configuration file, stored with the session
/// * `stop` - Signal checked between pages
///
/// # Example
///
/// ```no_run
/// use quote_harvester::config::load_config_with_hash;
/// use quote_harvester::crawler::run_scrape;
/// use quote_harvester::StopSignal;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("harvester.toml"))?;
/// let report = run_scrape(&config, &hash, StopSignal::new()).await?;
/// println!("added {} quotes", report.stats.records_added);
/// # Ok(())
/// # }
/// ```
pub async fn run_scrape(config: &Config, config_hash: &str, stop: StopSignal) -> Result<RunReport> {
    let store = open_store(Path::new(&config.output.database_path))?;
    let mut coordinator =
        Coordinator::from_config(config, config_hash, store)?.with_stop_signal(stop);
    coordinator.run().await
}
