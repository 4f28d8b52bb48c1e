//! Integration tests for the scrape pipeline
//!
//! These tests use wiremock to serve quote listing pages and run full
//! sessions against a SQLite database on disk.

use quote_harvester::config::{
    parse_config, Config, DetectionConfig, ExtractorConfig, IdentityConfig, OutputConfig,
    RequestConfig, ScraperConfig,
};
use quote_harvester::crawler::{run_scrape, Coordinator, Fetcher, NoopSleeper, QuoteExtractor};
use quote_harvester::storage::{SessionStatus, SqliteStore};
use quote_harvester::{QuoteStore, StopReason, StopSignal};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server, with no delays
fn create_test_config(base_url: &str, db_path: &Path, max_pages: u32) -> Config {
    Config {
        scraper: ScraperConfig {
            start_url: format!("{}/page/1/", base_url),
            page_url_template: Some(format!("{}/page/{{page}}/", base_url)),
            max_pages,
        },
        request: RequestConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
            max_retries: 3,
            timeout_secs: 5,
            seed: Some(7),
            requests_per_minute: None,
        },
        identity: IdentityConfig::default(),
        detection: DetectionConfig::default(),
        extractor: ExtractorConfig::default(),
        output: OutputConfig {
            database_path: db_path.to_string_lossy().to_string(),
            export_dir: "data".to_string(),
        },
    }
}

/// Coordinator over the real HTTP transport whose backoff sleeps return immediately
fn coordinator(config: &Config) -> Coordinator<SqliteStore> {
    let fetcher = Fetcher::from_config(config)
        .expect("Failed to build fetcher")
        .with_sleeper(Arc::new(NoopSleeper));
    let extractor = QuoteExtractor::new(&config.extractor).expect("Failed to build extractor");
    let store =
        SqliteStore::new(Path::new(&config.output.database_path)).expect("Failed to open store");

    Coordinator::new(
        fetcher,
        Box::new(extractor),
        store,
        config.scraper.start_url.clone(),
        config.scraper.max_pages,
    )
    .with_page_template(config.scraper.page_url_template.clone())
    .with_config_hash("integration")
}

fn quote_block(text: &str, author: &str, tags: &[&str]) -> String {
    let tags: String = tags
        .iter()
        .map(|t| format!(r#"<a class="tag" href="/tag/{0}/page/1/">{0}</a>"#, t))
        .collect();
    format!(
        r#"<div class="quote"><span class="text">“{}”</span><span>by <small class="author">{}</small></span><div class="tags">{}</div></div>"#,
        text, author, tags
    )
}

fn listing(blocks: &[String], next: Option<&str>) -> String {
    let pager = next
        .map(|href| {
            format!(
                r#"<nav><ul class="pager"><li class="next"><a href="{}">Next <span>→</span></a></li></ul></nav>"#,
                href
            )
        })
        .unwrap_or_default();
    format!(
        "<html><body><div class=\"container\">{}{}</div></body></html>",
        blocks.join(""),
        pager
    )
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_page_end_to_end() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/page/1/",
        listing(&[quote_block("A quote.", "Einstein", &["wisdom"])], None),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("quotes.db");
    let config = create_test_config(&server.uri(), &db_path, 10);

    let report = run_scrape(&config, "hash", StopSignal::new()).await.unwrap();

    assert_eq!(report.stop_reason, StopReason::EndOfPagination);
    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.stats.pages_fetched, 1);
    assert_eq!(report.stats.records_added, 1);
    assert_eq!(report.stats.duplicates_skipped, 0);

    let store = SqliteStore::new(&db_path).unwrap();
    let stats = store.stats().unwrap();
    assert_eq!(stats.quote_count, 1);
    assert_eq!(stats.author_count, 1);
    assert_eq!(stats.tag_count, 1);

    let quotes = store.all_quotes().unwrap();
    assert_eq!(quotes[0].text, "A quote.");
    assert_eq!(quotes[0].tags, vec!["wisdom".to_string()]);
    assert_eq!(
        quotes[0].source_url.as_deref(),
        Some(format!("{}/page/1/", server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_rerun_only_reports_duplicates() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/page/1/",
        listing(&[quote_block("A quote.", "Einstein", &["wisdom"])], None),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("quotes.db");
    let config = create_test_config(&server.uri(), &db_path, 10);

    let first = run_scrape(&config, "hash", StopSignal::new()).await.unwrap();
    let second = run_scrape(&config, "hash", StopSignal::new()).await.unwrap();

    assert_eq!(first.stats.records_added, 1);
    assert_eq!(first.stats.duplicates_skipped, 0);
    assert_eq!(second.stats.records_added, 0);
    assert_eq!(second.stats.duplicates_skipped, 1);

    let store = SqliteStore::new(&db_path).unwrap();
    let stats = store.stats().unwrap();
    assert_eq!(stats.quote_count, 1);
    assert_eq!(stats.author_count, 1);
    assert_eq!(stats.tag_count, 1);
    assert_eq!(store.count_sessions().unwrap(), 2);
    assert_ne!(first.session_id, second.session_id);
}

#[tokio::test]
async fn test_multi_page_walk_with_shared_authors_and_tags() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/page/1/",
        listing(
            &[
                quote_block("First.", "Albert Einstein", &["life", "wisdom"]),
                quote_block("Second.", "Jane Austen", &["love"]),
            ],
            Some("/page/2/"),
        ),
    )
    .await;
    mount_page(
        &server,
        "/page/2/",
        listing(
            &[
                quote_block("Third.", "Albert Einstein", &["wisdom"]),
                quote_block("First.", "Albert Einstein", &["other"]),
            ],
            None,
        ),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir.path().join("quotes.db"), 10);
    let mut coordinator = coordinator(&config);

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.stats.pages_fetched, 2);
    assert_eq!(report.stats.records_seen, 4);
    assert_eq!(report.stats.records_added, 3);
    assert_eq!(report.stats.duplicates_skipped, 1);

    let store = coordinator.store();
    assert_eq!(store.stats().unwrap().author_count, 2);
    assert_eq!(store.stats().unwrap().tag_count, 3);
    assert_eq!(
        store.top_authors(1).unwrap(),
        vec![("Albert Einstein".to_string(), 2)]
    );
    // First-seen tag set is kept for the duplicate
    assert!(store.quotes_by_tag("other").unwrap().is_empty());
}

#[tokio::test]
async fn test_transient_page_is_skipped_and_run_continues() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/page/1/",
        listing(&[quote_block("One.", "A", &[])], Some("/page/2/")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page/2/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(3)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/page/3/",
        listing(&[quote_block("Three.", "C", &[])], None),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &dir.path().join("quotes.db"), 10);
    // 503 is a transient server error here, not a block
    config.detection.block_status_codes = vec![403, 429];
    let mut coordinator = coordinator(&config);

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.stop_reason, StopReason::EndOfPagination);
    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.stats.pages_attempted, 3);
    assert_eq!(report.stats.fetch_errors, 1);
    assert!(report.stats.errors() >= 1);
    assert_eq!(report.stats.records_added, 2);
}

#[tokio::test]
async fn test_captcha_page_aborts_after_retries() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/page/1/",
        listing(&[quote_block("One.", "A", &[])], Some("/page/2/")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page/2/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<p>Please enter the CAPTCHA below</p>"),
        )
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir.path().join("quotes.db"), 10);
    let mut coordinator = coordinator(&config);

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.stop_reason, StopReason::Blocked);
    assert_eq!(report.status, SessionStatus::Aborted);
    assert_eq!(report.stats.blocked_count, 1);
    assert_eq!(report.stats.records_added, 1);

    let session = coordinator.store().get_session(report.session_id).unwrap();
    assert_eq!(session.status, SessionStatus::Aborted);
    assert_eq!(session.pages_fetched, 1);
}

#[tokio::test]
async fn test_redirect_to_challenge_page_is_a_block() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page/1/"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/cdn-cgi/challenge-platform/check"),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/cdn-cgi/challenge-platform/check",
        "<html><body>Checking your browser...</body></html>".to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &dir.path().join("quotes.db"), 10);
    config.detection.block_url_patterns = vec!["/cdn-cgi/challenge-platform".to_string()];
    let mut coordinator = coordinator(&config);

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.stop_reason, StopReason::Blocked);
    assert_eq!(report.stats.blocked_count, 1);
    assert_eq!(report.stats.records_added, 0);
}

#[tokio::test]
async fn test_skip_from_a_later_start_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/page/5/",
        listing(&[quote_block("Five.", "A", &[])], Some("/page/6/")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page/6/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/page/7/",
        listing(&[quote_block("Seven.", "B", &[])], None),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &dir.path().join("quotes.db"), 10);
    config.scraper.start_url = format!("{}/page/5/", server.uri());
    let mut coordinator = coordinator(&config);

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.stop_reason, StopReason::EndOfPagination);
    assert_eq!(report.stats.pages_attempted, 3);
    assert_eq!(report.stats.records_added, 2);
}

#[tokio::test]
async fn test_requests_carry_browser_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page/1/"))
        .and(header_exists("user-agent"))
        .and(header_exists("accept-language"))
        .and(header_exists("sec-fetch-mode"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing(&[quote_block("One.", "A", &[])], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir.path().join("quotes.db"), 10);
    let mut coordinator = coordinator(&config);

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.stats.records_added, 1);
}

#[tokio::test]
async fn test_max_pages_from_config_file() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/page/1/",
        listing(&[quote_block("One.", "A", &[])], Some("/page/2/")),
    )
    .await;
    mount_page(
        &server,
        "/page/2/",
        listing(&[quote_block("Two.", "B", &[])], Some("/page/3/")),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("quotes.db");
    let toml = format!(
        r#"
[scraper]
start-url = "{base}/page/1/"
max-pages = 1

[request]
min-delay-ms = 0
max-delay-ms = 0

[output]
database-path = "{db}"
"#,
        base = server.uri(),
        db = db_path.to_string_lossy().replace('\\', "/"),
    );
    let config = parse_config(&toml).unwrap();

    let report = run_scrape(&config, "hash", StopSignal::new()).await.unwrap();

    assert_eq!(report.stop_reason, StopReason::MaxPagesReached);
    assert_eq!(report.stats.pages_attempted, 1);
    assert_eq!(report.stats.records_added, 1);
}
