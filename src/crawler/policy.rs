//! Request policy
//!
//! Decides, without any I/O, which identity to present for the next request,
//! how long to wait before sending it, and how long to back off after a
//! retryable failure. All randomness comes from one owned generator so a
//! configured seed makes a whole session reproducible.

use crate::config::{default_user_agents, Config};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

/// Header set presented for one HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: String,
    /// Companion headers sent alongside the user agent
    pub headers: Vec<(String, String)>,
}

impl Identity {
    /// Builds the browser headers that a real client with this user agent would send
    pub fn for_user_agent(user_agent: &str) -> Self {
        let mut headers = vec![
            ("Accept".to_string(), ACCEPT.to_string()),
            ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
            ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
            ("Sec-Fetch-Dest".to_string(), "document".to_string()),
            ("Sec-Fetch-Mode".to_string(), "navigate".to_string()),
            ("Sec-Fetch-Site".to_string(), "none".to_string()),
            ("Sec-Fetch-User".to_string(), "?1".to_string()),
            ("Cache-Control".to_string(), "max-age=0".to_string()),
        ];

        // Client hints are only sent by Chromium-based browsers
        if let Some(version) = chromium_major_version(user_agent) {
            headers.push((
                "Sec-Ch-Ua".to_string(),
                format!(
                    "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"{v}\", \"Google Chrome\";v=\"{v}\"",
                    v = version
                ),
            ));
            headers.push(("Sec-Ch-Ua-Mobile".to_string(), "?0".to_string()));
            headers.push((
                "Sec-Ch-Ua-Platform".to_string(),
                format!("\"{}\"", platform_hint(user_agent)),
            ));
        }

        Self {
            user_agent: user_agent.to_string(),
            headers,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

fn chromium_major_version(user_agent: &str) -> Option<&str> {
    let start = user_agent.find("Chrome/")? + "Chrome/".len();
    let rest = &user_agent[start..];
    let end = rest.find('.').unwrap_or(rest.len());
    let version = &rest[..end];
    if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(version)
}

fn platform_hint(user_agent: &str) -> &'static str {
    if user_agent.contains("Windows") {
        "Windows"
    } else if user_agent.contains("Mac OS X") {
        "macOS"
    } else {
        "Linux"
    }
}

/// Per-request identity, pacing and backoff decisions
#[derive(Debug)]
pub struct RequestPolicy {
    identities: Vec<Identity>,
    min_delay: Duration,
    max_delay: Duration,
    rng: StdRng,
    last_identity: Option<usize>,
}

impl RequestPolicy {
    /// Creates a policy over the given user agent pool
    ///
    /// An empty pool falls back to the built-in browser pool. A `min_delay`
    /// above `max_delay` collapses the interval to `min_delay`.
    pub fn new(
        user_agents: &[String],
        min_delay: Duration,
        max_delay: Duration,
        seed: Option<u64>,
    ) -> Self {
        let pool = if user_agents.is_empty() {
            default_user_agents()
        } else {
            user_agents.to_vec()
        };

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            identities: pool.iter().map(|ua| Identity::for_user_agent(ua)).collect(),
            min_delay,
            max_delay: max_delay.max(min_delay),
            rng,
            last_identity: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.identity.user_agents,
            Duration::from_millis(config.request.min_delay_ms),
            Duration::from_millis(config.request.max_delay_ms),
            config.request.seed,
        )
    }

    pub fn pool_size(&self) -> usize {
        self.identities.len()
    }

    /// Picks a random identity, never the one returned by the previous call
    /// unless the pool holds a single entry
    pub fn next_identity(&mut self) -> Identity {
        let len = self.identities.len();
        let index = match self.last_identity {
            Some(last) if len > 1 => {
                // Sample among the other len - 1 entries, skipping over `last`
                let pick = self.rng.gen_range(0..len - 1);
                if pick >= last {
                    pick + 1
                } else {
                    pick
                }
            }
            _ => self.rng.gen_range(0..len),
        };

        self.last_identity = Some(index);
        self.identities[index].clone()
    }

    /// Uniform draw from [min_delay, max_delay]
    pub fn delay_before_request(&mut self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        if min >= max {
            return self.min_delay;
        }
        Duration::from_millis(self.rng.gen_range(min..=max))
    }

    /// `2^attempt + U(0,1)` seconds; `attempt` is zero-based
    pub fn backoff_delay(&mut self, attempt: u32) -> Duration {
        let base = 2f64.powi(attempt.min(30) as i32);
        let jitter: f64 = self.rng.gen();
        Duration::from_secs_f64(base + jitter)
    }
}
