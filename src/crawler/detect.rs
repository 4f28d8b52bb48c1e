//! Block detection
//!
//! A response is a block when any of these holds (all text matches are
//! case-insensitive):
//! - its status is one of the configured block codes
//! - its body contains a configured indicator keyword
//! - the final URL after redirects contains a challenge-host pattern
//! - its body carries challenge widget markup

use crate::config::DetectionConfig;

/// Classifies responses as anti-automation blocks
#[derive(Debug, Clone)]
pub struct BlockDetector {
    status_codes: Vec<u16>,
    keywords: Vec<String>,
    url_patterns: Vec<String>,
    markers: Vec<String>,
}

impl BlockDetector {
    pub fn new(status_codes: Vec<u16>, keywords: &[String]) -> Self {
        Self {
            status_codes,
            keywords: lowered(keywords),
            url_patterns: Vec::new(),
            markers: Vec::new(),
        }
    }

    pub fn with_url_patterns(mut self, patterns: &[String]) -> Self {
        self.url_patterns = lowered(patterns);
        self
    }

    pub fn with_markers(mut self, markers: &[String]) -> Self {
        self.markers = lowered(markers);
        self
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.block_status_codes.clone(), &config.block_keywords)
            .with_url_patterns(&config.block_url_patterns)
            .with_markers(&config.block_markers)
    }

    /// Returns a human-readable reason when the response is a block
    ///
    /// `final_url` is the address the body was served from, if the transport
    /// reports it.
    pub fn classify(&self, status: u16, body: &str, final_url: Option<&str>) -> Option<String> {
        if self.status_codes.contains(&status) {
            return Some(status_reason(status));
        }

        let body = body.to_lowercase();
        if let Some(keyword) = find_in(&self.keywords, &body) {
            return Some(keyword_reason(keyword));
        }

        if let Some(url) = final_url {
            if let Some(pattern) = find_in(&self.url_patterns, &url.to_lowercase()) {
                return Some(format!("Redirected to challenge page matching '{}'", pattern));
            }
        }

        find_in(&self.markers, &body)
            .map(|marker| format!("Challenge widget '{}' found in response body", marker))
    }

    pub fn is_blocked(&self, status: u16, body: &str) -> bool {
        self.classify(status, body, None).is_some()
    }
}

impl Default for BlockDetector {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

fn lowered(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn find_in<'a>(needles: &'a [String], haystack: &str) -> Option<&'a str> {
    needles
        .iter()
        .find(|needle| haystack.contains(needle.as_str()))
        .map(String::as_str)
}

fn status_reason(status: u16) -> String {
    match status {
        403 => "Access Forbidden - IP may be blocked".to_string(),
        429 => "Too Many Requests - Rate limited".to_string(),
        503 => "Service Unavailable - May be under protection".to_string(),
        other => format!("HTTP {} - Block status", other),
    }
}

fn keyword_reason(keyword: &str) -> String {
    if keyword.contains("captcha") {
        "CAPTCHA Challenge Detected".to_string()
    } else {
        format!("Block indicator '{}' found in response body", keyword)
    }
}
