//! Sliding-window request limiter
//!
//! Keeps the timestamps of admitted requests. A request is admitted when
//! fewer than `max_requests` timestamps fall inside the trailing window;
//! refused requests are not recorded. State is in-memory only and owned by
//! a single caller, so there is no locking.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default number of requests per window
pub const DEFAULT_MAX_REQUESTS: usize = 10;

/// Default window length
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(60_000);

/// Sliding-window rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    timestamps: VecDeque<Instant>,
    max_requests: usize,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit and record a request if the window has room
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use markdown_format_converter::rate_limit::RateLimiter;
    ///
    /// let mut limiter = RateLimiter::new(2, Duration::from_secs(1));
    /// assert!(limiter.can_make_request());
    /// assert!(limiter.can_make_request());
    /// assert!(!limiter.can_make_request());
    /// ```
    pub fn can_make_request(&mut self) -> bool {
        self.can_make_request_at(Instant::now())
    }

    /// [`Self::can_make_request`] with an explicit clock reading
    pub fn can_make_request_at(&mut self, now: Instant) -> bool {
        self.prune(now);

        if self.timestamps.len() < self.max_requests {
            self.timestamps.push_back(now);
            debug!(
                used = self.timestamps.len(),
                max = self.max_requests,
                "rate limit check: allowed"
            );
            true
        } else {
            warn!(
                max = self.max_requests,
                window_ms = self.window.as_millis() as u64,
                "rate limit exceeded"
            );
            false
        }
    }

    /// Requests still admissible in the current window
    pub fn remaining_requests(&mut self) -> usize {
        self.remaining_requests_at(Instant::now())
    }

    /// [`Self::remaining_requests`] with an explicit clock reading
    pub fn remaining_requests_at(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.max_requests.saturating_sub(self.timestamps.len())
    }

    /// Drop timestamps that have aged out of the window
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}
