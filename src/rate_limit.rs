//! Rate limiting: server wait hints and a client-side request counter.
//!
//! VNDB answers excessive traffic with `429 Too Many Requests`. The wait the
//! server asks for is parsed from the response headers here and attached to
//! [`Error::RateLimit`](crate::Error::RateLimit), where the retry engine
//! picks it up. [`RateLimiter`] is the local, best-effort counterpart that
//! spaces out requests before the server has to complain.

use http::HeaderMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Extracts the server's requested wait from response headers.
///
/// Checks, in order:
/// - `Retry-After` (delay-seconds or HTTP date)
/// - `X-RateLimit-Reset` (Unix timestamp)
/// - `RateLimit-Reset` (Unix timestamp)
///
/// # Examples
///
/// ```
/// use vndb_kana::rate_limit::retry_after_from_headers;
/// use http::HeaderMap;
/// use std::time::Duration;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("retry-after", "60".parse().unwrap());
///
/// assert_eq!(retry_after_from_headers(&headers), Some(Duration::from_secs(60)));
/// ```
pub fn retry_after_from_headers(headers: &HeaderMap) -> Option<Duration> {
    parse_retry_after(headers).or_else(|| {
        let reset_at = parse_reset(headers, "x-ratelimit-reset")
            .or_else(|| parse_reset(headers, "ratelimit-reset"))?;
        reset_at.duration_since(SystemTime::now()).ok()
    })
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get("retry-after")?.to_str().ok()?.trim();

    if let Ok(seconds) = header.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date_time = httpdate::parse_http_date(header).ok()?;
    date_time.duration_since(SystemTime::now()).ok()
}

fn parse_reset(headers: &HeaderMap, name: &str) -> Option<SystemTime> {
    let timestamp = headers.get(name)?.to_str().ok()?.trim().parse::<u64>().ok()?;
    Some(UNIX_EPOCH + Duration::from_secs(timestamp))
}

/// Window size and request budget for a [`RateLimiter`].
///
/// The default mirrors the public VNDB limit of 200 requests per 5 minutes.
/// A `max_requests` of 0 turns the limiter off; every request is let through.
///
/// # Examples
///
/// ```
/// use vndb_kana::rate_limit::RateLimiterConfig;
/// use std::time::Duration;
///
/// let config = RateLimiterConfig::new(10, Duration::from_secs(1));
/// assert_eq!(config.max_requests, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Requests allowed inside one window; 0 means unlimited.
    pub max_requests: usize,
    /// Length of the sliding window.
    pub window: Duration,
}

impl RateLimiterConfig {
    /// Creates a config allowing `max_requests` per `window`.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 200,
            window: Duration::from_secs(300),
        }
    }
}

/// Sliding-window request counter owned by a single client.
///
/// Each permit is checked and recorded under one short lock, so two callers
/// cannot both take the last slot. It is still only a local guess at the
/// server's budget; the server's 429 responses remain authoritative.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates an empty limiter.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            timestamps: Mutex::new(VecDeque::with_capacity(config.max_requests)),
        }
    }

    /// Returns the limiter configuration.
    pub fn config(&self) -> RateLimiterConfig {
        self.config
    }

    /// Records a request if the window has room.
    ///
    /// Returns `Ok(())` when the request was recorded, or `Err(wait)` with the
    /// time until the oldest request leaves the window.
    pub fn try_acquire(&self) -> std::result::Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }

    /// Number of requests recorded in the current window.
    pub fn in_flight(&self) -> usize {
        let mut timestamps = self.lock();
        prune(&mut timestamps, Instant::now(), self.config.window);
        timestamps.len()
    }

    /// Waits until a slot is free, then records the request.
    pub async fn acquire(&self) {
        loop {
            match self.try_acquire() {
                Ok(()) => return,
                Err(wait) => {
                    tracing::debug!(
                        wait_ms = wait.as_millis(),
                        max_requests = self.config.max_requests,
                        "Local rate limit reached - delaying request"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Forgets every recorded request.
    pub fn reset(&self) {
        self.lock().clear();
    }

    fn try_acquire_at(&self, now: Instant) -> std::result::Result<(), Duration> {
        if self.config.max_requests == 0 {
            return Ok(());
        }

        let mut timestamps = self.lock();
        prune(&mut timestamps, now, self.config.window);

        if timestamps.len() < self.config.max_requests {
            timestamps.push_back(now);
            return Ok(());
        }

        let oldest = timestamps.front().copied().unwrap_or(now);
        let wait = match oldest.checked_add(self.config.window) {
            Some(free_at) => free_at.saturating_duration_since(now),
            None => Duration::MAX,
        };
        Err(wait.max(Duration::from_millis(1)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Instant>> {
        // A panic while holding the lock cannot leave the deque inconsistent.
        self.timestamps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = timestamps.front() {
        if now.saturating_duration_since(oldest) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}
