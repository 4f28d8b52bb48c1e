use crate::config::types::{
    Config, DetectionConfig, ExtractorConfig, IdentityConfig, OutputConfig, RequestConfig,
    ScraperConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Smallest identity pool that still makes rotation meaningful
pub const MIN_IDENTITY_POOL: usize = 5;

/// Placeholder substituted with the page number in `page-url-template`
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_request_config(&config.request)?;
    validate_identity_config(&config.identity)?;
    validate_detection_config(&config.detection)?;
    validate_extractor_config(&config.extractor)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    validate_http_url("start-url", &config.start_url)?;

    if let Some(template) = &config.page_url_template {
        if !template.contains(PAGE_PLACEHOLDER) {
            return Err(ConfigError::Validation(format!(
                "page-url-template must contain {}, got '{}'",
                PAGE_PLACEHOLDER, template
            )));
        }
        validate_http_url("page-url-template", &template.replace(PAGE_PLACEHOLDER, "1"))?;
    }

    // The only termination guarantee when the site keeps advertising a next page
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

fn validate_request_config(config: &RequestConfig) -> Result<(), ConfigError> {
    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min-delay-ms ({}) must not exceed max-delay-ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    if config.max_retries < 1 || config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be between 1 and 10, got {}",
            config.max_retries
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.requests_per_minute == Some(0) {
        return Err(ConfigError::Validation(
            "requests-per-minute must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_identity_config(config: &IdentityConfig) -> Result<(), ConfigError> {
    if config.user_agents.len() < MIN_IDENTITY_POOL {
        return Err(ConfigError::Validation(format!(
            "identity pool needs at least {} user agents, got {}",
            MIN_IDENTITY_POOL,
            config.user_agents.len()
        )));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user agents cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_detection_config(config: &DetectionConfig) -> Result<(), ConfigError> {
    if let Some(code) = config
        .block_status_codes
        .iter()
        .find(|code| !(100..=599).contains(*code))
    {
        return Err(ConfigError::Validation(format!(
            "block-status-codes contains invalid HTTP status {}",
            code
        )));
    }

    for (field, entries) in [
        ("block-keywords", &config.block_keywords),
        ("block-url-patterns", &config.block_url_patterns),
        ("block-markers", &config.block_markers),
    ] {
        if entries.iter().any(|entry| entry.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{} cannot contain empty entries",
                field
            )));
        }
    }

    Ok(())
}

fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    for selector in [
        &config.quote_selector,
        &config.text_selector,
        &config.author_selector,
        &config.tag_selector,
        &config.next_selector,
    ] {
        Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
            selector: selector.clone(),
            message: format!("{:?}", e),
        })?;
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.export_dir.is_empty() {
        return Err(ConfigError::Validation(
            "export-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Parses a URL and requires an http(s) scheme
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
