//! Exponential backoff for opening provider streams.
//!
//! Retries apply only while a stream is being opened. Once the provider has
//! started sending chunks, a failure is final for that pass.

use std::time::Duration;

/// Retry policy for transient failures when opening a stream.
///
/// # Example
///
/// ```
/// use kitchencraft_stream::backend::BackoffConfig;
///
/// assert_eq!(BackoffConfig::none().max_retries, 0);
/// assert_eq!(BackoffConfig::interactive().max_retries, 2);
/// ```
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Retries after the first attempt. `0` disables retry.
    pub max_retries: u32,

    /// Base delay before the first retry.
    pub initial_delay: Duration,

    /// Growth factor applied per retry.
    pub multiplier: f64,

    /// Upper bound on a single delay.
    pub max_delay: Duration,

    /// Randomize each delay within `[0, delay]`.
    pub jitter: bool,

    /// HTTP statuses worth retrying.
    pub retryable_statuses: Vec<u16>,

    /// Prefer the provider's `Retry-After` hint over the computed delay.
    pub respect_retry_after: bool,
}

impl BackoffConfig {
    /// No retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::standard()
        }
    }

    /// 3 retries, 1s initial delay, doubling, capped at 30s.
    pub fn standard() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: true,
            retryable_statuses: vec![408, 429, 500, 502, 503, 504],
            respect_retry_after: true,
        }
    }

    /// Short waits for a user watching a recipe appear: 2 retries, 500ms
    /// initial delay, capped at 5s.
    pub fn interactive() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            multiplier: 1.5,
            max_delay: Duration::from_secs(5),
            ..Self::standard()
        }
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        if self.jitter {
            Duration::from_secs_f64(fastrand::f64() * capped)
        } else {
            Duration::from_secs_f64(capped)
        }
    }

    /// Delay before retry `attempt`, honoring a `Retry-After` hint when
    /// configured to. The hint is still capped at `max_delay`.
    pub fn delay_with_hint(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) if self.respect_retry_after => hint.min(self.max_delay),
            _ => self.delay_for_attempt(attempt),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::none()
    }
}
