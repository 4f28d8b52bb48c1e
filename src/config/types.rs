use serde::Deserialize;

/// Main configuration structure for Quote-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    pub output: OutputConfig,
}

/// Pagination behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// First listing page to fetch
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Template used to derive the successor of a page that could not be fetched.
    /// Must contain `{page}`, e.g. `https://quotes.toscrape.com/page/{page}/`
    #[serde(rename = "page-url-template", default)]
    pub page_url_template: Option<String>,

    /// Hard upper bound on pages fetched in one session
    #[serde(rename = "max-pages")]
    pub max_pages: u32,
}

/// Request pacing and retry behavior
#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    /// Lower bound of the pre-request delay (milliseconds)
    #[serde(rename = "min-delay-ms", default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the pre-request delay (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Total attempts per page, including the first one
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Fixed seed for identity and delay selection
    #[serde(default)]
    pub seed: Option<u64>,

    /// Cap on requests sent in any sliding 60 second window (unlimited when unset)
    #[serde(rename = "requests-per-minute", default)]
    pub requests_per_minute: Option<u32>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            seed: None,
            requests_per_minute: None,
        }
    }
}

/// Pool of browser identities presented to the target site
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_agents: default_user_agents(),
        }
    }
}

/// Block detection rules
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    #[serde(rename = "block-status-codes", default = "default_block_status_codes")]
    pub block_status_codes: Vec<u16>,

    /// Matched case-insensitively against the response body
    #[serde(rename = "block-keywords", default = "default_block_keywords")]
    pub block_keywords: Vec<String>,

    /// Matched case-insensitively against the final URL after redirects
    #[serde(rename = "block-url-patterns", default = "default_block_url_patterns")]
    pub block_url_patterns: Vec<String>,

    /// Challenge widget markup, matched case-insensitively against the body
    #[serde(rename = "block-markers", default = "default_block_markers")]
    pub block_markers: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            block_status_codes: default_block_status_codes(),
            block_keywords: default_block_keywords(),
            block_url_patterns: default_block_url_patterns(),
            block_markers: default_block_markers(),
        }
    }
}

/// CSS selectors used to pull quote records out of a listing page
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    #[serde(rename = "quote-selector", default = "default_quote_selector")]
    pub quote_selector: String,

    #[serde(rename = "text-selector", default = "default_text_selector")]
    pub text_selector: String,

    #[serde(rename = "author-selector", default = "default_author_selector")]
    pub author_selector: String,

    #[serde(rename = "tag-selector", default = "default_tag_selector")]
    pub tag_selector: String,

    #[serde(rename = "next-selector", default = "default_next_selector")]
    pub next_selector: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            quote_selector: default_quote_selector(),
            text_selector: default_text_selector(),
            author_selector: default_author_selector(),
            tag_selector: default_tag_selector(),
            next_selector: default_next_selector(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory that receives CSV/JSON exports
    #[serde(rename = "export-dir", default = "default_export_dir")]
    pub export_dir: String,
}

fn default_min_delay_ms() -> u64 {
    1500
}

fn default_max_delay_ms() -> u64 {
    3500
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_block_status_codes() -> Vec<u16> {
    vec![403, 429, 503]
}

fn default_block_keywords() -> Vec<String> {
    ["captcha", "blocked", "access denied"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_block_url_patterns() -> Vec<String> {
    ["google.com/recaptcha", "hcaptcha.com", "challenges.cloudflare.com"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_block_markers() -> Vec<String> {
    [
        "id=\"captcha\"",
        "class=\"captcha\"",
        "id=\"recaptcha\"",
        "class=\"g-recaptcha\"",
        "class=\"h-captcha\"",
        "data-sitekey=",
        "cf-turnstile",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_quote_selector() -> String {
    "div.quote".to_string()
}

fn default_text_selector() -> String {
    "span.text".to_string()
}

fn default_author_selector() -> String {
    "small.author".to_string()
}

fn default_tag_selector() -> String {
    "a.tag".to_string()
}

fn default_next_selector() -> String {
    "li.next a".to_string()
}

fn default_export_dir() -> String {
    "data".to_string()
}

/// Real desktop browser user agents (Chrome, Firefox, Safari, Edge)
pub fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 11.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
