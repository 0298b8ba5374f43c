//! Retry policy and backoff for transient failures.
//!
//! A [`RetryPolicy`] is an immutable description of how hard to try: how
//! many retries, how the delay grows, and which errors are worth another
//! attempt. [`retry`] runs any async operation under a policy. It is the only
//! place in the crate that decides whether to try again.

use crate::{Error, Result};
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Trait for determining whether a failed request should be retried.
///
/// Implemented by the predicates in this module, by [`OrPredicate`] and
/// [`AndPredicate`], and by any `Fn(&Error, usize) -> bool` closure.
///
/// # Examples
///
/// ```
/// use vndb_kana::{Error, RetryPredicate};
///
/// struct RetryOnBadGateway;
///
/// impl RetryPredicate for RetryOnBadGateway {
///     fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
///         error.status().map(|s| s.as_u16()) == Some(502)
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// Determines whether the request should be retried based on the error.
    ///
    /// `attempt` is the 1-indexed number of the attempt that just failed.
    fn should_retry(&self, error: &Error, attempt: usize) -> bool;
}

impl<F> RetryPredicate for F
where
    F: Fn(&Error, usize) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self(error, attempt)
    }
}

/// The default eligibility rule: server errors, rate limiting, and transient
/// transport failures (connection reset, name resolution, connection refused).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetryPredicate;

impl RetryPredicate for DefaultRetryPredicate {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.is_server_error() || error.is_rate_limit() || error.is_transient_transport()
    }
}

/// Retry only on 5xx server errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnServerError;

impl RetryPredicate for RetryOnServerError {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.is_server_error()
    }
}

/// Retry only when rate limited.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnRateLimit;

impl RetryPredicate for RetryOnRateLimit {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.is_rate_limit()
    }
}

/// Retry only on transient transport failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTransient;

impl RetryPredicate for RetryOnTransient {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.is_transient_transport()
    }
}

/// Retry only on request timeouts.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTimeout;

impl RetryPredicate for RetryOnTimeout {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(
            error,
            Error::Transport {
                kind: crate::TransportKind::Timeout,
                ..
            }
        )
    }
}

/// Never retry.
#[derive(Debug, Clone, Copy)]
pub struct NeverRetry;

impl RetryPredicate for NeverRetry {
    fn should_retry(&self, _error: &Error, _attempt: usize) -> bool {
        false
    }
}

/// Combine multiple retry predicates with OR logic.
///
/// # Examples
///
/// ```
/// use vndb_kana::retry::{OrPredicate, RetryOnServerError, RetryOnTimeout};
///
/// let predicate = OrPredicate::new(vec![
///     Box::new(RetryOnServerError),
///     Box::new(RetryOnTimeout),
/// ]);
/// ```
pub struct OrPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl OrPredicate {
    /// Creates a new `OrPredicate` from a list of predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for OrPredicate {
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicates
            .iter()
            .any(|p| p.should_retry(error, attempt))
    }
}

/// Combine multiple retry predicates with AND logic.
///
/// # Examples
///
/// ```
/// use vndb_kana::retry::{AndPredicate, DefaultRetryPredicate};
/// use vndb_kana::Error;
///
/// // Default rules, but give up on anything after the second attempt.
/// let predicate = AndPredicate::new(vec![
///     Box::new(DefaultRetryPredicate),
///     Box::new(|_: &Error, attempt: usize| attempt < 2),
/// ]);
/// ```
pub struct AndPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl AndPredicate {
    /// Creates a new `AndPredicate` from a list of predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for AndPredicate {
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicates
            .iter()
            .all(|p| p.should_retry(error, attempt))
    }
}

/// How many times to retry and how long to wait in between.
///
/// The wait before retry `n` (1-indexed) is
/// `min(max_delay, base_delay * backoff_multiplier^(n-1))`, unless the
/// failure is a rate-limit error carrying the server's own wait, which is
/// used as is.
///
/// The policy holds no per-call state and can be cloned and shared freely.
///
/// # Examples
///
/// ```
/// use vndb_kana::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_retries(5)
///     .base_delay(Duration::from_millis(500))
///     .max_delay(Duration::from_secs(10))
///     .build()?;
///
/// assert_eq!(policy.backoff_delay(1), Duration::from_millis(500));
/// assert_eq!(policy.backoff_delay(3), Duration::from_millis(2000));
/// # Ok::<(), vndb_kana::Error>(())
/// ```
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
    jitter: bool,
    max_hint_wait: Duration,
    predicate: Arc<dyn RetryPredicate>,
}

impl RetryPolicy {
    /// Creates a builder starting from the default policy.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// A policy that runs the operation exactly once.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Maximum number of retries after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Delay before the first retry.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Upper bound for computed delays.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Growth factor between consecutive delays.
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Whether `error` is eligible for another attempt.
    pub fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicate.should_retry(error, attempt)
    }

    /// The computed backoff before retrying after failed attempt `attempt`.
    ///
    /// Never exceeds `max_delay`, however large `attempt` gets. With jitter
    /// enabled the result is scaled by a random factor in `[0.5, 1.0]`.
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
        let factor = self.backoff_multiplier.powi(exponent);
        let millis = self.base_delay.as_millis() as f64 * factor;
        let cap = self.max_delay.as_millis() as f64;

        let delay = if millis.is_finite() && millis < cap {
            Duration::from_millis(millis.round() as u64)
        } else {
            self.max_delay
        };

        if self.jitter {
            let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
            delay.mul_f64(jitter_factor)
        } else {
            delay
        }
    }

    /// Longest wait taken from a server rate-limit hint.
    pub fn max_hint_wait(&self) -> Duration {
        self.max_hint_wait
    }

    /// The wait before retrying after `error`: the server's rate-limit hint,
    /// capped at [`max_hint_wait`](Self::max_hint_wait), if it sent one,
    /// otherwise [`backoff_delay`](Self::backoff_delay).
    pub fn delay_for(&self, error: &Error, attempt: usize) -> Duration {
        match error.retry_after() {
            Some(hint) if crate::error::is_rate_limit_error(error) => {
                hint.min(self.max_hint_wait)
            }
            _ => self.backoff_delay(attempt),
        }
    }
}

impl Default for RetryPolicy {
    /// 3 retries, 1 s base delay doubling up to 30 s, rate-limit hints
    /// honored up to 60 s, using [`DefaultRetryPredicate`].
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            backoff_multiplier: 2.0,
            jitter: false,
            max_hint_wait: Duration::from_secs(60),
            predicate: Arc::new(DefaultRetryPredicate),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter", &self.jitter)
            .field("max_hint_wait", &self.max_hint_wait)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Default)]
pub struct RetryPolicyBuilder {
    max_retries: Option<usize>,
    base_delay: Option<Duration>,
    max_delay: Option<Duration>,
    backoff_multiplier: Option<f64>,
    jitter: Option<bool>,
    max_hint_wait: Option<Duration>,
    predicate: Option<Arc<dyn RetryPredicate>>,
}

impl RetryPolicyBuilder {
    /// Sets the number of retries after the first attempt.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets the delay before the first retry.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = Some(delay);
        self
    }

    /// Sets the ceiling for computed delays.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Sets the growth factor; must be greater than 1.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    /// Enables random jitter on computed delays.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Caps how long a server `Retry-After` hint may delay one retry.
    pub fn max_hint_wait(mut self, wait: Duration) -> Self {
        self.max_hint_wait = Some(wait);
        self
    }

    /// Sets the retry predicate.
    pub fn predicate(mut self, predicate: impl RetryPredicate + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Builds the policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the multiplier is not a finite number
    /// greater than 1, or the base delay exceeds the max delay.
    pub fn build(self) -> Result<RetryPolicy> {
        let default = RetryPolicy::default();
        let policy = RetryPolicy {
            max_retries: self.max_retries.unwrap_or(default.max_retries),
            base_delay: self.base_delay.unwrap_or(default.base_delay),
            max_delay: self.max_delay.unwrap_or(default.max_delay),
            backoff_multiplier: self.backoff_multiplier.unwrap_or(default.backoff_multiplier),
            jitter: self.jitter.unwrap_or(default.jitter),
            max_hint_wait: self.max_hint_wait.unwrap_or(default.max_hint_wait),
            predicate: self.predicate.unwrap_or(default.predicate),
        };

        if !policy.backoff_multiplier.is_finite() || policy.backoff_multiplier <= 1.0 {
            return Err(Error::validation(format!(
                "backoff multiplier must be greater than 1, got {}",
                policy.backoff_multiplier
            )));
        }
        if policy.base_delay > policy.max_delay {
            return Err(Error::validation(format!(
                "base delay {:?} exceeds max delay {:?}",
                policy.base_delay, policy.max_delay
            )));
        }

        Ok(policy)
    }
}

/// Runs `operation` under `policy`, retrying eligible failures.
///
/// Returns the first success, or the last failure once the policy gives up.
/// Dropping the returned future cancels any pending backoff wait.
///
/// # Examples
///
/// ```
/// use vndb_kana::{retry::retry, Error, RetryPolicy};
///
/// # async fn example() -> Result<(), Error> {
/// let policy = RetryPolicy::default();
/// let value = retry(&policy, || async { Ok::<_, Error>(42) }).await?;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```
pub async fn retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(attempts = attempt, "Operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if attempt > policy.max_retries {
            if policy.max_retries > 0 {
                tracing::warn!(
                    error = %error,
                    attempts = attempt,
                    "Retries exhausted"
                );
            }
            return Err(error);
        }

        if !policy.should_retry(&error, attempt) {
            tracing::debug!(error = %error, attempt = attempt, "Error is not retryable");
            return Err(error);
        }

        let delay = policy.delay_for(&error, attempt);
        if error.retry_after().is_some() {
            tracing::info!(
                rate_limit_delay_ms = delay.as_millis(),
                attempt = attempt,
                max_wait_secs = policy.max_hint_wait.as_secs(),
                "Rate limited - waiting before retry"
            );
        } else {
            tracing::info!(
                delay_ms = delay.as_millis(),
                attempt = attempt,
                "Retrying after delay"
            );
        }

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportKind;
    use http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn server_error() -> Error {
        Error::api(StatusCode::INTERNAL_SERVER_ERROR, "boom")
    }

    #[test]
    fn test_backoff_doubles_then_clamps() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (1..=6)
            .map(|attempt| policy.backoff_delay(attempt).as_millis())
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000]);
    }

    #[test]
    fn test_backoff_survives_huge_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(10_000), Duration::from_secs(30));
        assert_eq!(policy.backoff_delay(usize::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::builder().jitter(true).build().unwrap();
        for _ in 0..50 {
            let delay = policy.backoff_delay(2);
            assert!(delay >= Duration::from_millis(1000) && delay <= Duration::from_millis(2000));
        }
    }

    #[test]
    fn test_rate_limit_hint_overrides_backoff() {
        let policy = RetryPolicy::default();
        let limited = Error::rate_limit("Throttled", Some(Duration::from_secs(5)));
        assert_eq!(policy.delay_for(&limited, 1), Duration::from_millis(5000));
        assert_eq!(policy.delay_for(&limited, 6), Duration::from_millis(5000));

        let no_hint = Error::rate_limit("Throttled", None);
        assert_eq!(policy.delay_for(&no_hint, 2), Duration::from_millis(2000));
    }

    #[test]
    fn test_rate_limit_hint_is_capped() {
        let mut headers = http::HeaderMap::new();
        headers.insert("retry-after", http::HeaderValue::from_static("31536000"));
        let limited =
            Error::classify_response(StatusCode::TOO_MANY_REQUESTS, &headers, String::new());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(31_536_000)));

        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(&limited, 1), Duration::from_secs(60));

        let policy = RetryPolicy::builder()
            .max_hint_wait(Duration::from_secs(10))
            .build()
            .unwrap();
        assert_eq!(policy.max_hint_wait(), Duration::from_secs(10));
        assert_eq!(policy.delay_for(&limited, 1), Duration::from_secs(10));
    }

    #[test]
    fn test_builder_validates() {
        assert!(matches!(
            RetryPolicy::builder().backoff_multiplier(1.0).build(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            RetryPolicy::builder().backoff_multiplier(f64::INFINITY).build(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            RetryPolicy::builder()
                .base_delay(Duration::from_secs(60))
                .max_delay(Duration::from_secs(1))
                .build(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_default_predicate() {
        let p = DefaultRetryPredicate;
        assert!(p.should_retry(&server_error(), 1));
        assert!(p.should_retry(&Error::rate_limit("slow", None), 1));
        assert!(p.should_retry(&Error::api(StatusCode::TOO_MANY_REQUESTS, "slow"), 1));
        assert!(p.should_retry(&Error::transport(TransportKind::ConnectionRefused, "refused"), 1));
        assert!(p.should_retry(&Error::transport(TransportKind::NameResolution, "dns"), 1));
        assert!(!p.should_retry(&Error::transport(TransportKind::Timeout, "slow"), 1));
        assert!(!p.should_retry(&Error::api(StatusCode::NOT_FOUND, "gone"), 1));
        assert!(!p.should_retry(&Error::authentication(None), 1));
        assert!(!p.should_retry(&Error::validation("bad filter"), 1));
    }

    #[test]
    fn test_combined_predicates() {
        let either = OrPredicate::new(vec![Box::new(RetryOnTimeout), Box::new(RetryOnRateLimit)]);
        assert!(either.should_retry(&Error::transport(TransportKind::Timeout, "t"), 1));
        assert!(!either.should_retry(&server_error(), 1));

        let both = AndPredicate::new(vec![
            Box::new(RetryOnServerError),
            Box::new(|_: &Error, attempt: usize| attempt < 2),
        ]);
        assert!(both.should_retry(&server_error(), 1));
        assert!(!both.should_retry(&server_error(), 2));
        assert!(!NeverRetry.should_retry(&server_error(), 1));
        assert!(RetryOnTransient.should_retry(
            &Error::transport(TransportKind::ConnectionReset, "reset"),
            1
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_exhaust_retries() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::default();

        let result: Result<()> = retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(server_error()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), policy.max_retries() + 1);
        assert!(matches!(result, Err(Error::Api { status, .. }) if status == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule_is_slept() {
        let policy = RetryPolicy::default();
        let start = tokio::time::Instant::now();

        let _ = retry(&policy, || async { Err::<(), _>(server_error()) }).await;

        // 1000 + 2000 + 4000 before attempts 2, 3 and 4.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(7000), "slept {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(7100), "slept {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_errors_run_once() {
        let calls = AtomicUsize::new(0);
        let start = tokio::time::Instant::now();

        let result: Result<()> = retry(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::validation("field must not be empty")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_runs_once() {
        let calls = AtomicUsize::new(0);

        let result: Result<()> = retry(&RetryPolicy::none(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(server_error()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicUsize::new(0);

        let result = retry(&RetryPolicy::default(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::transport(TransportKind::ConnectionReset, "reset by peer"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_rate_limit_hint() {
        let calls = AtomicUsize::new(0);
        let start = tokio::time::Instant::now();

        let result = retry(&RetryPolicy::default(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(Error::rate_limit("Throttled", Some(Duration::from_secs(5))))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(5000), "slept {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(5100), "slept {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_future_cancels_backoff() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::default();

        let outcome = tokio::time::timeout(
            Duration::from_millis(1500),
            retry(&policy, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(server_error()) }
            }),
        )
        .await;

        assert!(outcome.is_err());
        // First attempt at 0ms, second at 1000ms, third would be at 3000ms.
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
