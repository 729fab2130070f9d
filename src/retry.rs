//! Retry logic for throttled API requests
//!
//! This module wraps a single network operation with rate-limiter admission
//! and exponential-backoff retries. Only a server throttling signal
//! ([`Error::RateLimited`]) is retried; every other failure propagates
//! immediately — the wrapper owns rate-limit recovery, not generic fault
//! tolerance.
//!
//! # Example
//!
//! ```no_run
//! use chatlog_dl::config::{RateLimitConfig, RetryConfig};
//! use chatlog_dl::rate_limit::RateLimiter;
//! use chatlog_dl::retry::fetch_with_retry;
//! use chatlog_dl::error::Error;
//!
//! # async fn example() -> Result<(), Error> {
//! let limiter = RateLimiter::new(RateLimitConfig::default());
//! let config = RetryConfig::default();
//! let _page = fetch_with_retry(&limiter, &config, || async {
//!     // Your fetch here
//!     Ok::<_, Error>(Vec::<u8>::new())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::rate_limit::RateLimiter;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Here only the remote throttling signal qualifies; permanent failures
/// (auth, missing channel, I/O, serialization) must surface to the caller.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }
}

/// Execute a network operation with rate-limiter admission and backoff retries
///
/// Each attempt first waits for a slot from the [`RateLimiter`], then runs the
/// operation. A throttled attempt sleeps `initial_delay * multiplier^(n-1)`
/// (capped at `max_delay`) before attempt `n+1`; a server `Retry-After` hint
/// raises the sleep but never lowers it. `max_attempts` counts every attempt,
/// including the first.
///
/// # Returns
///
/// The successful result, or the last error once attempts are exhausted.
/// Non-retryable errors return after the first occurrence.
pub async fn fetch_with_retry<F, Fut, T>(
    limiter: &RateLimiter,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1u32;
    let mut delay = config.initial_delay;

    loop {
        limiter.admit().await;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "request succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                // Computed backoff, raised to the server's hint when present
                let mut sleep_for = delay;
                if let Error::RateLimited {
                    retry_after: Some(hint),
                } = &e
                {
                    sleep_for = sleep_for.max(*hint);
                }
                if config.jitter {
                    sleep_for = add_jitter(sleep_for);
                }

                tracing::warn!(
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = sleep_for.as_millis() as u64,
                    "request throttled, backing off"
                );

                tokio::time::sleep(sleep_for).await;

                delay = Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
                    .min(config.max_delay);
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        attempts = attempt,
                        "request still throttled after all retry attempts"
                    );
                } else {
                    tracing::error!(error = %e, "request failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay lands between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
