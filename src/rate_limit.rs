//! Per-client sliding-window request throttling.
//!
//! Every client identity (usually the peer IP) gets its own list of request
//! timestamps. Only requests within the trailing window are counted; they are
//! recomputed on each check rather than bucketed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Default number of requests allowed per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 10;

/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 60;

/// Configuration for rate limiting.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the time window.
    pub max_requests: u32,
    /// Time window for counting requests.
    pub window: Duration,
}

impl RateLimitConfig {
    /// Create a new rate limit configuration.
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECS)
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is admitted and has been recorded.
    Allowed,
    /// Request is denied; nothing was recorded.
    Denied {
        /// Time until the oldest request in the window ages out.
        retry_after: Duration,
    },
}

impl RateLimitResult {
    /// Check if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed)
    }
}

/// Request timestamps for a single client, oldest first.
#[derive(Debug, Default)]
struct ClientRequests {
    timestamps: Vec<Instant>,
}

impl ClientRequests {
    /// Drop timestamps that are `window` or more in the past.
    fn prune(&mut self, now: Instant, window: Duration) {
        self.timestamps
            .retain(|&t| now.saturating_duration_since(t) < window);
    }

    fn retry_after(&self, now: Instant, window: Duration) -> Duration {
        self.timestamps
            .first()
            .map(|&oldest| window.saturating_sub(now.saturating_duration_since(oldest)))
            .unwrap_or(Duration::ZERO)
    }
}

/// Sliding-window rate limiter keyed by client identity.
///
/// The whole check-then-record sequence runs under one lock, so concurrent
/// requests from the same client can never be admitted past the limit.
///
/// # Example
///
/// ```
/// use nudge::rate_limit::{RateLimitConfig, SlidingWindowLimiter};
///
/// let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(2, 60));
///
/// assert!(limiter.is_allowed("10.0.0.1"));
/// assert!(limiter.is_allowed("10.0.0.1"));
/// assert!(!limiter.is_allowed("10.0.0.1"));
/// assert!(limiter.is_allowed("10.0.0.2"));
/// ```
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    clients: Mutex<HashMap<String, ClientRequests>>,
}

impl SlidingWindowLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Get the limiter configuration.
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<String, ClientRequests>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check whether a client may proceed, recording the request if so.
    pub fn is_allowed(&self, client_id: &str) -> bool {
        self.check(client_id).is_allowed()
    }

    /// Check and record a request at the current instant.
    pub fn check(&self, client_id: &str) -> RateLimitResult {
        self.check_at(client_id, Instant::now())
    }

    /// Check and record a request at `now`.
    ///
    /// Returns `Allowed` and records the request, or `Denied` without
    /// recording it.
    pub fn check_at(&self, client_id: &str, now: Instant) -> RateLimitResult {
        let mut clients = self.clients();
        let requests = clients.entry(client_id.to_string()).or_default();

        requests.prune(now, self.config.window);

        if requests.timestamps.len() >= self.config.max_requests as usize {
            return RateLimitResult::Denied {
                retry_after: requests.retry_after(now, self.config.window),
            };
        }

        requests.timestamps.push(now);
        RateLimitResult::Allowed
    }

    /// Get the number of requests a client can still make right now.
    pub fn remaining(&self, client_id: &str) -> u32 {
        self.remaining_at(client_id, Instant::now())
    }

    /// Get the number of requests a client can still make at `now`.
    pub fn remaining_at(&self, client_id: &str, now: Instant) -> u32 {
        let clients = self.clients();
        let used = clients
            .get(client_id)
            .map(|r| {
                r.timestamps
                    .iter()
                    .filter(|&&t| now.saturating_duration_since(t) < self.config.window)
                    .count()
            })
            .unwrap_or(0);

        self.config.max_requests.saturating_sub(used as u32)
    }

    /// Number of client identities currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients().len()
    }

    /// Prune every client and forget those with no recent requests.
    ///
    /// Call this periodically to free memory.
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    /// Same as [`cleanup`](Self::cleanup) with an explicit instant.
    pub fn cleanup_at(&self, now: Instant) {
        let mut clients = self.clients();
        for requests in clients.values_mut() {
            requests.prune(now, self.config.window);
        }
        clients.retain(|_, requests| !requests.timestamps.is_empty());
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_config() {
        let config = RateLimitConfig::new(5, 60);
        assert_eq!(config.max_requests, 5);
        assert_eq!(config.window, Duration::from_secs(60));

        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 10);
        assert_eq!(config.window, Duration::from_secs(60));
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(3, 60));
        let now = Instant::now();

        assert!(limiter.check_at("1.1.1.1", now).is_allowed());
        assert!(limiter.check_at("1.1.1.1", now).is_allowed());
        assert!(limiter.check_at("1.1.1.1", now).is_allowed());
    }

    #[test]
    fn test_denies_over_limit() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(2, 60));
        let now = Instant::now();

        assert!(limiter.check_at("1.1.1.1", now).is_allowed());
        assert!(limiter.check_at("1.1.1.1", now + Duration::from_secs(10)).is_allowed());

        let result = limiter.check_at("1.1.1.1", now + Duration::from_secs(20));
        match result {
            RateLimitResult::Denied { retry_after } => {
                // Oldest request was 20s ago.
                assert_eq!(retry_after, Duration::from_secs(40));
            }
            _ => panic!("Expected Denied"),
        }
    }

    #[test]
    fn test_denied_request_is_not_recorded() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(1, 60));
        let now = Instant::now();

        assert!(limiter.check_at("c", now).is_allowed());
        for i in 1..10 {
            assert!(!limiter
                .check_at("c", now + Duration::from_secs(i))
                .is_allowed());
        }

        // Only the first request counts, so it ages out at exactly 60s.
        assert!(limiter.check_at("c", now + Duration::from_secs(60)).is_allowed());
    }

    #[test]
    fn test_readmitted_after_window() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(2, 60));
        let now = Instant::now();

        assert!(limiter.check_at("c", now).is_allowed());
        assert!(limiter.check_at("c", now).is_allowed());
        assert!(!limiter.check_at("c", now + Duration::from_secs(59)).is_allowed());

        assert!(limiter.check_at("c", now + Duration::from_secs(60)).is_allowed());
    }

    #[test]
    fn test_sliding_not_fixed_bucket() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(2, 60));
        let t0 = Instant::now();

        assert!(limiter.check_at("c", t0).is_allowed());
        assert!(limiter.check_at("c", t0 + Duration::from_secs(30)).is_allowed());
        assert!(!limiter.check_at("c", t0 + Duration::from_secs(45)).is_allowed());

        // The t0 entry has aged out; the t0+30 entry still counts.
        assert!(limiter.check_at("c", t0 + Duration::from_secs(61)).is_allowed());
        assert!(!limiter.check_at("c", t0 + Duration::from_secs(62)).is_allowed());

        // Once t0+30 ages out, one slot frees up again.
        assert!(limiter.check_at("c", t0 + Duration::from_secs(90)).is_allowed());
    }

    #[test]
    fn test_separate_clients() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(2, 60));

        assert!(limiter.is_allowed("127.0.0.1"));
        assert!(limiter.is_allowed("127.0.0.1"));
        assert!(!limiter.is_allowed("127.0.0.1"));

        assert!(limiter.is_allowed("192.168.1.1"));
        assert!(limiter.is_allowed("192.168.1.1"));
    }

    #[test]
    fn test_remaining_count() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(5, 60));
        let now = Instant::now();

        assert_eq!(limiter.remaining_at("c", now), 5);

        limiter.check_at("c", now);
        assert_eq!(limiter.remaining_at("c", now), 4);

        limiter.check_at("c", now);
        limiter.check_at("c", now);
        assert_eq!(limiter.remaining_at("c", now), 2);

        assert_eq!(limiter.remaining_at("c", now + Duration::from_secs(60)), 5);
    }

    #[test]
    fn test_cleanup_forgets_idle_clients() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(5, 60));
        let now = Instant::now();

        limiter.check_at("a", now);
        limiter.check_at("b", now + Duration::from_secs(30));
        assert_eq!(limiter.tracked_clients(), 2);

        limiter.cleanup_at(now + Duration::from_secs(61));
        assert_eq!(limiter.tracked_clients(), 1);
        assert_eq!(limiter.remaining_at("b", now + Duration::from_secs(61)), 4);

        limiter.cleanup_at(now + Duration::from_secs(200));
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_zero_limit_denies_everything() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(0, 60));
        let result = limiter.check("c");
        assert_eq!(
            result,
            RateLimitResult::Denied {
                retry_after: Duration::ZERO
            }
        );
    }
}
