//! Retry policy with capped exponential backoff.
//!
//! Transient faults against persistence backends are retried under a
//! throttled policy: exponential growth, a hard interval cap, and a small
//! jitter so concurrent retries do not synchronize.
//!
//! # Example
//!
//! ```rust
//! use rudder_core::retry::{retry_with_policy, RetryPolicy};
//!
//! # #[derive(Debug)] struct TransientError;
//! # tokio_test::block_on(async {
//! let policy = RetryPolicy::default();
//! let result: Result<u32, TransientError> =
//!     retry_with_policy(&policy, |_| true, || async { Ok(7) }).await;
//! assert_eq!(result.unwrap(), 7);
//! # });
//! ```

use std::future::Future;
use std::time::Duration;

/// Maximum jitter added to each backoff interval, in milliseconds.
const JITTER_CAP_MS: u64 = 50;

/// Capped exponential backoff policy for transient faults.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Upper bound on any single backoff interval.
    pub max_interval: Duration,
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(50),
            max_interval: Duration::from_secs(10),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with default intervals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub const fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Sets the upper bound on any single backoff interval.
    #[must_use]
    pub const fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Sets the total number of attempts, including the first.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }
}

/// Runs an operation under a retry policy.
///
/// The operation is attempted up to `policy.max_attempts` times. Between
/// attempts the driver sleeps for an exponentially growing interval, capped
/// at `policy.max_interval`, plus jitter. Only errors accepted by
/// `is_retryable` are retried; any other error is returned immediately.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, or the first
/// non-retryable error.
pub async fn retry_with_policy<T, E, P, F, Fut>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    P: Fn(&E) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = policy.initial_interval;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_attempts.max(1) || !is_retryable(&err) {
                    return Err(err);
                }
                attempt += 1;

                let jitter = Duration::from_millis(rand_jitter());
                let delay = backoff.min(policy.max_interval) + jitter;
                tokio::time::sleep(delay).await;
                backoff = backoff.saturating_mul(2);
            }
        }
    }
}

/// Generates random jitter in milliseconds.
fn rand_jitter() -> u64 {
    // Simple time-seeded jitter (avoids a full rand dependency for this
    // simple case).
    use std::time::SystemTime;
    let seed = u64::from(
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos(),
    );
    seed % JITTER_CAP_MS
}
