//! Configuration module for Quote-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use quote_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Will fetch at most {} pages", config.scraper.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_user_agents, Config, DetectionConfig, ExtractorConfig, IdentityConfig, OutputConfig,
    RequestConfig, ScraperConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub use validation::{validate, MIN_IDENTITY_POOL, PAGE_PLACEHOLDER};
