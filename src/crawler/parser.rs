//! HTML parser for extracting quote records
//!
//! This module turns one listing page into:
//! - The quote records on it (text, author, tag labels)
//! - The absolute URL of the next listing page, if any

use crate::config::ExtractorConfig;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Errors raised while extracting records from a page
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Invalid next-page link '{href}': {message}")]
    InvalidNextLink { href: String, message: String },
}

/// One raw record as found on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRecord {
    pub text: String,
    pub author: String,
    pub tags: Vec<String>,
}

/// Everything extracted from one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    pub records: Vec<QuoteRecord>,

    /// Absolute URL of the following page; `None` ends pagination
    pub next_page: Option<String>,
}

impl ExtractedPage {
    pub fn is_last_page(&self) -> bool {
        self.next_page.is_none()
    }
}

/// Turns page content into records plus a pagination signal
pub trait RecordExtractor: Send + Sync {
    fn extract(&self, html: &str, page_url: &Url) -> Result<ExtractedPage, ExtractError>;
}

/// CSS-selector based extractor for quote listing markup
#[derive(Debug)]
pub struct QuoteExtractor {
    quote: Selector,
    text: Selector,
    author: Selector,
    tag: Selector,
    next: Selector,
}

impl QuoteExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            quote: parse_selector(&config.quote_selector)?,
            text: parse_selector(&config.text_selector)?,
            author: parse_selector(&config.author_selector)?,
            tag: parse_selector(&config.tag_selector)?,
            next: parse_selector(&config.next_selector)?,
        })
    }

    fn record_from(&self, element: ElementRef<'_>) -> Option<QuoteRecord> {
        let text = element
            .select(&self.text)
            .next()
            .map(|e| strip_quote_marks(&e.text().collect::<String>()))
            .filter(|t| !t.is_empty())?;

        let author = element
            .select(&self.author)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|a| !a.is_empty())?;

        let tags = element
            .select(&self.tag)
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Some(QuoteRecord { text, author, tags })
    }

    fn next_page(&self, document: &Html, page_url: &Url) -> Result<Option<String>, ExtractError> {
        let href = match document
            .select(&self.next)
            .find_map(|e| e.value().attr("href"))
            .map(str::trim)
            .filter(|h| !h.is_empty())
        {
            Some(href) => href,
            None => return Ok(None),
        };

        page_url
            .join(href)
            .map(|url| Some(url.to_string()))
            .map_err(|e| ExtractError::InvalidNextLink {
                href: href.to_string(),
                message: e.to_string(),
            })
    }
}

impl RecordExtractor for QuoteExtractor {
    fn extract(&self, html: &str, page_url: &Url) -> Result<ExtractedPage, ExtractError> {
        let document = Html::parse_document(html);

        let mut records = Vec::new();
        for element in document.select(&self.quote) {
            match self.record_from(element) {
                Some(record) => records.push(record),
                None => tracing::debug!("Skipping quote block without text or author on {}", page_url),
            }
        }

        let next_page = self.next_page(&document, page_url)?;

        Ok(ExtractedPage { records, next_page })
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Trims whitespace and the surrounding curly or straight quote marks
fn strip_quote_marks(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '\u{201C}' || c == '\u{201D}' || c == '"')
        .trim()
        .to_string()
}
