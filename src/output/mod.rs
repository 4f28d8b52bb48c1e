//! Output module for reports and exports
//!
//! This module handles:
//! - Store statistics and per-session summaries for the console
//! - Exporting stored quotes as JSON or CSV

mod export;
pub mod stats;

pub use export::{
    export_csv, export_json, export_path, export_quotes, write_csv, ExportFormat,
};
pub use stats::{
    format_session_summary, format_statistics, load_statistics, print_session_summary,
    print_statistics, StoreStatistics,
};
