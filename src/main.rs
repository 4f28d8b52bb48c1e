//! Quote-Harvester main entry point
//!
//! This is the command-line interface for the Quote-Harvester scraper.

use clap::{Parser, ValueEnum};
use quote_harvester::config::{load_config_with_hash, Config};
use quote_harvester::crawler::run_scrape;
use quote_harvester::output::{
    export_path, export_quotes, load_statistics, print_session_summary, print_statistics,
    ExportFormat,
};
use quote_harvester::storage::{open_store, StoredQuote};
use quote_harvester::{QuoteStore, StopSignal};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const TOP_N: usize = 10;

/// Conventional exit status for termination by SIGINT
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Quote-Harvester: a resilient quote scraper
///
/// Quote-Harvester walks paginated quote listings with rotating browser
/// identities, politeness delays and retry with backoff, and stores the
/// results in a deduplicated SQLite database.
#[derive(Parser, Debug)]
#[command(name = "quote-harvester")]
#[command(version)]
#[command(about = "A resilient quote scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the configured page limit
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Seed identity and delay selection for a reproducible run
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Validate config and show what would be scraped without fetching anything
    #[arg(long, group = "mode")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, group = "mode")]
    stats: bool,

    /// Export all stored quotes to the export directory and exit
    #[arg(long, value_enum, value_name = "FORMAT", group = "mode")]
    export: Option<ExportArg>,

    /// Search stored quotes by keyword
    #[arg(long, value_name = "KEYWORD", group = "mode")]
    search: Option<String>,

    /// List stored quotes by author (substring match)
    #[arg(long, value_name = "NAME", group = "mode")]
    author: Option<String>,

    /// List stored quotes by tag (substring match)
    #[arg(long, value_name = "TAG", group = "mode")]
    tag: Option<String>,

    /// Print one random stored quote
    #[arg(long, group = "mode")]
    random: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ExportArg {
    Json,
    Csv,
}

impl From<ExportArg> for ExportFormat {
    fn from(arg: ExportArg) -> Self {
        match arg {
            ExportArg::Json => ExportFormat::Json,
            ExportArg::Csv => ExportFormat::Csv,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(max_pages) = cli.max_pages {
        config.scraper.max_pages = max_pages;
    }
    if let Some(seed) = cli.seed {
        config.request.seed = Some(seed);
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(format) = cli.export {
        handle_export(&config, format.into())?;
    } else if let Some(keyword) = &cli.search {
        let store = open_store(Path::new(&config.output.database_path))?;
        print_quotes(&store.search_quotes(keyword)?, &format!("matching '{}'", keyword));
    } else if let Some(author) = &cli.author {
        let store = open_store(Path::new(&config.output.database_path))?;
        print_quotes(&store.quotes_by_author(author)?, &format!("by '{}'", author));
    } else if let Some(tag) = &cli.tag {
        let store = open_store(Path::new(&config.output.database_path))?;
        print_quotes(&store.quotes_by_tag(tag)?, &format!("tagged '{}'", tag));
    } else if cli.random {
        handle_random(&config)?;
    } else {
        handle_scrape(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("quote_harvester=info,warn"),
            1 => EnvFilter::new("quote_harvester=debug,info"),
            2 => EnvFilter::new("quote_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Quote-Harvester Dry Run ===\n");

    println!("Scraper:");
    println!("  Start URL: {}", config.scraper.start_url);
    match &config.scraper.page_url_template {
        Some(template) => println!("  Page URL template: {}", template),
        None => println!("  Page URL template: (none, skipped pages end the run)"),
    }
    println!("  Max pages: {}", config.scraper.max_pages);

    println!("\nRequests:");
    println!(
        "  Delay: {}-{}ms",
        config.request.min_delay_ms, config.request.max_delay_ms
    );
    println!("  Attempts per page: {}", config.request.max_retries);
    println!("  Timeout: {}s", config.request.timeout_secs);
    match config.request.seed {
        Some(seed) => println!("  Seed: {}", seed),
        None => println!("  Seed: (random)"),
    }
    match config.request.requests_per_minute {
        Some(limit) => println!("  Requests per minute: {}", limit),
        None => println!("  Requests per minute: (unlimited)"),
    }
    println!("  User agents: {}", config.identity.user_agents.len());

    println!("\nBlock detection:");
    println!("  Status codes: {:?}", config.detection.block_status_codes);
    println!("  Keywords: {:?}", config.detection.block_keywords);
    println!("  URL patterns: {:?}", config.detection.block_url_patterns);
    println!("  Markup markers: {:?}", config.detection.block_markers);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Export directory: {}", config.output.export_dir);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&store, TOP_N)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export mode: writes every stored quote to a timestamped file
fn handle_export(config: &Config, format: ExportFormat) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(Path::new(&config.output.database_path))?;
    let quotes = store.all_quotes()?;

    if quotes.is_empty() {
        tracing::warn!("No quotes stored, nothing to export");
        return Ok(());
    }

    let path = export_path(Path::new(&config.output.export_dir), format);
    export_quotes(&quotes, &path, format)?;
    println!("✓ Exported {} quotes to: {}", quotes.len(), path.display());

    Ok(())
}

fn handle_random(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(Path::new(&config.output.database_path))?;
    match store.random_quote()? {
        Some(quote) => print_quote(&quote),
        None => println!("No quotes stored yet"),
    }
    Ok(())
}

fn print_quotes(quotes: &[StoredQuote], description: &str) {
    println!("Found {} quotes {}\n", quotes.len(), description);
    for quote in quotes {
        print_quote(quote);
    }
}

fn print_quote(quote: &StoredQuote) {
    println!("“{}”", quote.text);
    println!("    - {}", quote.author);
    if !quote.tags.is_empty() {
        println!("    [{}]", quote.tags.join(", "));
    }
    println!();
}

/// Handles the main scrape operation
async fn handle_scrape(config: &Config, config_hash: &str) -> Result<(), Box<dyn std::error::Error>> {
    let stop = StopSignal::new();
    let handle = stop.clone();
    tokio::spawn(async move {
        // The handler stays installed for the whole process, so the second
        // interrupt has to exit explicitly
        while tokio::signal::ctrl_c().await.is_ok() {
            if handle.request_stop() {
                tracing::warn!(
                    "Interrupt received, stopping after the current page (Ctrl-C again to quit now)"
                );
            } else {
                tracing::error!("Second interrupt received, exiting immediately");
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        }
    });

    match run_scrape(config, config_hash, stop).await {
        Ok(report) => {
            print_session_summary(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            Err(e.into())
        }
    }
}
