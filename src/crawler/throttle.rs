//! Sliding-window request cap
//!
//! Complements the per-page politeness delay: however short the random
//! delays turn out, no more than `limit` requests are sent within any
//! `period`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MINUTE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RateWindow {
    limit: usize,
    period: Duration,
    sent: VecDeque<Instant>,
}

impl RateWindow {
    /// `limit` of zero is treated as one
    pub fn new(limit: u32, period: Duration) -> Self {
        let limit = limit.max(1) as usize;
        Self {
            limit,
            period,
            sent: VecDeque::with_capacity(limit),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, MINUTE)
    }

    /// How long to wait at `now` before another request fits in the window
    pub fn wait_time(&mut self, now: Instant) -> Duration {
        while let Some(oldest) = self.sent.front() {
            if now.saturating_duration_since(*oldest) < self.period {
                break;
            }
            self.sent.pop_front();
        }

        if self.sent.len() < self.limit {
            return Duration::ZERO;
        }

        self.sent
            .front()
            .map(|oldest| {
                self.period
                    .saturating_sub(now.saturating_duration_since(*oldest))
            })
            .unwrap_or(Duration::ZERO)
    }

    /// Records a request sent at `now`
    ///
    /// Only the newest `limit` entries are kept; a caller that waited out
    /// `wait_time` has already let the oldest one expire.
    pub fn record(&mut self, now: Instant) {
        self.sent.push_back(now);
        while self.sent.len() > self.limit {
            self.sent.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_under_the_limit_do_not_wait() {
        let mut window = RateWindow::per_minute(3);
        let t0 = Instant::now();

        for i in 0..3 {
            let now = t0 + Duration::from_secs(i);
            assert_eq!(window.wait_time(now), Duration::ZERO);
            window.record(now);
        }
    }

    #[test]
    fn test_full_window_waits_for_oldest_to_expire() {
        let mut window = RateWindow::per_minute(2);
        let t0 = Instant::now();

        window.record(t0);
        window.record(t0 + Duration::from_secs(10));

        assert_eq!(
            window.wait_time(t0 + Duration::from_secs(15)),
            Duration::from_secs(45)
        );
    }

    #[test]
    fn test_expired_requests_leave_the_window() {
        let mut window = RateWindow::per_minute(2);
        let t0 = Instant::now();

        window.record(t0);
        window.record(t0 + Duration::from_secs(10));

        assert_eq!(window.wait_time(t0 + Duration::from_secs(60)), Duration::ZERO);
    }

    #[test]
    fn test_record_after_waiting_drops_the_oldest() {
        let mut window = RateWindow::new(1, Duration::from_secs(30));
        let t0 = Instant::now();

        window.record(t0);
        assert_eq!(window.wait_time(t0), Duration::from_secs(30));

        // Clock has not moved (the wait was simulated), the window still admits one
        window.record(t0);
        assert_eq!(window.wait_time(t0), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_limit_behaves_as_one() {
        let mut window = RateWindow::new(0, MINUTE);
        let t0 = Instant::now();

        assert_eq!(window.wait_time(t0), Duration::ZERO);
        window.record(t0);
        assert_eq!(window.wait_time(t0), MINUTE);
    }
}
