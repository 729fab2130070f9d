//! Request rate limiting using a sliding timestamp window
//!
//! The RateLimiter paces outbound API requests so that no more than a
//! configured number are issued inside a rolling window.

use crate::config::RateLimitConfig;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Request rate limiter shared by every fetch in a scrape
///
/// Tracks the timestamp of each admitted request inside a rolling window
/// (default 10 requests per 1000 ms) and suspends callers until a slot frees.
///
/// # Algorithm
///
/// - Every admitted request records an `Instant` in the window
/// - Timestamps older than the window length are pruned on every check
/// - A full window suspends the caller until the oldest entry ages out
///
/// The remote API enforces true per-second windows rather than token buckets,
/// so pruning by wall-clock timestamp guarantees compliance without overshoot.
/// The window is owned exclusively by the limiter; no other component reads
/// or writes it.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    /// Timestamps of requests admitted inside the current window
    window: Arc<Mutex<VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a new RateLimiter with the given window configuration
    ///
    /// A `max_requests` of 0 disables limiting entirely.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let capacity = config.max_requests;
        Self {
            config,
            window: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
        }
    }

    /// Wait until a request slot is available, then reserve it
    ///
    /// Returns immediately while the window has room. When the window is
    /// full, sleeps until the oldest recorded request leaves the window, then
    /// re-checks. The sleep is a cooperative `tokio::time::sleep`, never a
    /// blocking call.
    pub async fn admit(&self) {
        // Fast path: limiting disabled
        if self.config.max_requests == 0 {
            return;
        }

        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();

                // Prune entries that have aged out of the window
                while window
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.config.window)
                {
                    window.pop_front();
                }

                if window.len() < self.config.max_requests {
                    window.push_back(now);
                    return;
                }

                // Window full: wait until the oldest entry ages out
                match window.front() {
                    Some(oldest) => (*oldest + self.config.window).saturating_duration_since(now),
                    None => continue,
                }
            };

            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate window full, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Number of requests currently recorded inside the window
    ///
    /// Diagnostic only; prunes aged entries before counting.
    pub async fn in_flight(&self) -> usize {
        let mut window = self.window.lock().await;
        let now = Instant::now();
        while window
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.config.window)
        {
            window.pop_front();
        }
        window.len()
    }
}
