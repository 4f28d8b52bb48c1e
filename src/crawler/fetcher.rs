//! HTTP fetcher implementation
//!
//! This module performs one logical "get page" operation, including:
//! - Building the HTTP client used by the default transport
//! - Applying the politeness delay before the first attempt
//! - Rotating identities across attempts
//! - Retrying transient failures and blocks with exponential backoff
//! - Classifying the final response

use crate::config::Config;
use crate::crawler::detect::BlockDetector;
use crate::crawler::policy::{Identity, RequestPolicy};
use crate::crawler::throttle::RateWindow;
use crate::session::FetchEvent;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// Status and body of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    /// URL the response was served from after redirects, when the transport knows it
    pub final_url: Option<String>,
}

/// Failure below the HTTP layer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Timeouts, refused or reset connections, truncated bodies
    #[error("Transient transport error: {0}")]
    Transient(String),

    /// The request could not be built or sent at all
    #[error("Fatal transport error: {0}")]
    Fatal(String),
}

/// Source of page content by URL
///
/// The fetcher only sees this trait, so a plain HTTP client and a browser
/// automation backend are interchangeable.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get(&self, url: &Url, identity: &Identity) -> Result<RawResponse, TransportError>;
}

/// Timed suspension used for politeness delays and backoff
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSleeper;

#[async_trait]
impl Sleeper for NoopSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// Builds the HTTP client used by [`HttpPageSource`]
///
/// No default user agent is set; every request carries the identity chosen
/// for that attempt.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `PageSource` backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(timeout)?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(Duration::from_secs(config.request.timeout_secs))
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn get(&self, url: &Url, identity: &Identity) -> Result<RawResponse, TransportError> {
        let mut request = self
            .client
            .get(url.clone())
            .header(USER_AGENT, identity.user_agent.as_str());
        for (name, value) in &identity.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let final_url = Some(response.url().to_string());
        let body = response.text().await.map_err(classify_reqwest_error)?;

        Ok(RawResponse {
            status,
            body,
            final_url,
        })
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_builder() {
        TransportError::Fatal(error.to_string())
    } else if error.is_timeout() {
        TransportError::Transient("Request timeout".to_string())
    } else if error.is_connect() {
        TransportError::Transient(format!("Connection failed: {}", error))
    } else {
        TransportError::Transient(error.to_string())
    }
}

/// Final result of fetching one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { status: u16, body: String },
    Blocked { status: u16, reason: String },
    TransientError { cause: String },
    FatalError { cause: String },
}

impl FetchOutcome {
    pub fn kind(&self) -> FetchEvent {
        match self {
            FetchOutcome::Success { .. } => FetchEvent::Success,
            FetchOutcome::Blocked { .. } => FetchEvent::Blocked,
            FetchOutcome::TransientError { .. } => FetchEvent::TransientError,
            FetchOutcome::FatalError { .. } => FetchEvent::FatalError,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchOutcome::Blocked { .. } | FetchOutcome::TransientError { .. }
        )
    }
}

impl From<TransportError> for FetchOutcome {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Transient(cause) => FetchOutcome::TransientError { cause },
            TransportError::Fatal(cause) => FetchOutcome::FatalError { cause },
        }
    }
}

/// Position in the bounded retry sequence of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Attempt `k` (zero-based) is in flight
    Attempting(u32),
    /// Attempt `k - 1` failed; attempt `k` follows after backoff
    Retrying(u32),
    /// No attempts remain
    Exhausted,
}

/// Bounded retry state machine
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    max_attempts: u32,
    step: RetryStep,
}

impl RetrySchedule {
    /// `max_attempts` counts the first attempt; zero is treated as one
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            step: RetryStep::Attempting(0),
        }
    }

    pub fn step(&self) -> RetryStep {
        self.step
    }

    /// Records a retryable failure of the current attempt
    pub fn on_failure(&mut self) -> RetryStep {
        self.step = match self.step {
            RetryStep::Attempting(k) if k + 1 < self.max_attempts => RetryStep::Retrying(k + 1),
            RetryStep::Attempting(_) => RetryStep::Exhausted,
            other => other,
        };
        self.step
    }

    /// Starts the pending retry, returning its attempt index
    pub fn resume(&mut self) -> Option<u32> {
        match self.step {
            RetryStep::Retrying(k) => {
                self.step = RetryStep::Attempting(k);
                Some(k)
            }
            _ => None,
        }
    }
}

/// Fetches pages through a `PageSource`, applying the request policy
pub struct Fetcher {
    source: Box<dyn PageSource>,
    policy: RequestPolicy,
    detector: BlockDetector,
    sleeper: Arc<dyn Sleeper>,
    max_retries: u32,
    rate_window: Option<RateWindow>,
}

impl Fetcher {
    pub fn new(
        source: Box<dyn PageSource>,
        policy: RequestPolicy,
        detector: BlockDetector,
        sleeper: Arc<dyn Sleeper>,
        max_retries: u32,
    ) -> Self {
        Self {
            source,
            policy,
            detector,
            sleeper,
            max_retries,
            rate_window: None,
        }
    }

    /// Builds a fetcher over the reqwest transport with real sleeps
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            Box::new(HttpPageSource::from_config(config)?),
            RequestPolicy::from_config(config),
            BlockDetector::from_config(&config.detection),
            Arc::new(TokioSleeper),
            config.request.max_retries,
        )
        .with_requests_per_minute(config.request.requests_per_minute))
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Caps requests (every attempt counts) per sliding minute; `None` removes the cap
    pub fn with_requests_per_minute(mut self, limit: Option<u32>) -> Self {
        self.rate_window = limit.map(RateWindow::per_minute);
        self
    }

    /// Fetches one page
    ///
    /// Retryable outcomes (transport failures and blocks) are absorbed here
    /// until attempts run out; the returned outcome is final for the page.
    pub async fn fetch(&mut self, url: &str) -> FetchOutcome {
        let target = match parse_target(url) {
            Ok(target) => target,
            Err(cause) => {
                tracing::error!("Refusing to fetch {}: {}", url, cause);
                return FetchOutcome::FatalError { cause };
            }
        };

        let delay = self.policy.delay_before_request();
        tracing::trace!("Waiting {:?} before requesting {}", delay, url);
        self.sleeper.sleep(delay).await;

        let mut schedule = RetrySchedule::new(self.max_retries);
        let mut attempt = 0;

        loop {
            let identity = self.policy.next_identity();
            tracing::debug!(
                "GET {} (attempt {}/{}) as {}",
                url,
                attempt + 1,
                self.max_retries.max(1),
                identity.user_agent
            );

            self.throttle().await;
            let outcome = match self.source.get(&target, &identity).await {
                Ok(response) => self.classify_response(response),
                Err(error) => error.into(),
            };

            if !outcome.is_retryable() {
                return outcome;
            }

            match schedule.on_failure() {
                RetryStep::Retrying(next) => {
                    let backoff = self.policy.backoff_delay(attempt);
                    tracing::warn!(
                        "Attempt {} for {} failed ({}), retrying in {:.1}s",
                        attempt + 1,
                        url,
                        describe(&outcome),
                        backoff.as_secs_f64()
                    );
                    self.sleeper.sleep(backoff).await;
                    schedule.resume();
                    attempt = next;
                }
                _ => {
                    tracing::warn!(
                        "Giving up on {} after {} attempts: {}",
                        url,
                        attempt + 1,
                        describe(&outcome)
                    );
                    return outcome;
                }
            }
        }
    }

    async fn throttle(&mut self) {
        let Some(window) = self.rate_window.as_mut() else {
            return;
        };

        let wait = window.wait_time(Instant::now());
        if !wait.is_zero() {
            tracing::info!("Request rate limit reached, waiting {:.1}s", wait.as_secs_f64());
            self.sleeper.sleep(wait).await;
        }
        window.record(Instant::now());
    }

    fn classify_response(&self, response: RawResponse) -> FetchOutcome {
        let RawResponse {
            status,
            body,
            final_url,
        } = response;

        if let Some(reason) = self.detector.classify(status, &body, final_url.as_deref()) {
            return FetchOutcome::Blocked { status, reason };
        }

        match status {
            200..=299 => FetchOutcome::Success { status, body },
            408 | 500..=599 => FetchOutcome::TransientError {
                cause: format!("HTTP {}", status),
            },
            _ => FetchOutcome::FatalError {
                cause: format!("HTTP {}", status),
            },
        }
    }
}

fn parse_target(url: &str) -> Result<Url, String> {
    let parsed = Url::parse(url).map_err(|e| format!("invalid URL '{}': {}", url, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(format!("unsupported scheme '{}' in '{}'", other, url)),
    }
}

fn describe(outcome: &FetchOutcome) -> String {
    match outcome {
        FetchOutcome::Success { status, .. } => format!("HTTP {}", status),
        FetchOutcome::Blocked { status, reason } => format!("blocked with {}: {}", status, reason),
        FetchOutcome::TransientError { cause } | FetchOutcome::FatalError { cause } => cause.clone(),
    }
}
