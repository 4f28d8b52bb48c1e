//! Quote-Harvester: a resilient quote scraper
//!
//! This crate walks paginated quote listings, tolerates anti-automation defenses
//! (rotating identities, politeness delays, retry with backoff, block detection)
//! and stores the results in a deduplicated SQLite database while tracking
//! per-run statistics.

pub mod config;
pub mod crawler;
pub mod output;
pub mod session;
pub mod storage;

use thiserror::Error;

/// Main error type for Quote-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Extraction error: {0}")]
    Extract(#[from] crawler::ExtractError),

    #[error("Export error: {0}")]
    Export(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Result type alias for Quote-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, FetchOutcome, Fetcher, RequestPolicy, RunReport, StopReason};
pub use session::{SessionStats, SessionTracker, StopSignal};
pub use storage::{IngestResult, QuoteStore, SqliteStore};
