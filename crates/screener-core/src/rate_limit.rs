//! Fixed-interval rate limiting.
//!
//! [`RateLimiter`] spaces calls to one provider by at least a minimum
//! interval. Callers reserve the next free slot under a lock and then sleep
//! until it, so concurrent fetches stay compliant without serializing the
//! sleep itself.
//!
//! An operation that issues several requests reserves one slot per request
//! with [`RateLimiter::acquire_n`] and proceeds at the last of them.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

/// Rate limiter guaranteeing a minimum interval between acquisitions.
#[derive(Debug)]
pub struct RateLimiter {
    next_slot: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    /// Creates a limiter; the first acquisition is immediate.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            next_slot: Mutex::new(None),
            min_interval,
        }
    }

    /// The configured minimum interval.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until a call is allowed and reserves it.
    pub async fn acquire(&self) {
        self.acquire_n(1).await;
    }

    /// Reserves `requests` consecutive slots and waits until the last one.
    ///
    /// The next caller is held back one interval past that last slot, so a
    /// burst of `requests` calls never exceeds the average rate. Zero is
    /// treated as one.
    pub async fn acquire_n(&self, requests: u32) {
        let requests = requests.max(1);
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let first = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            let last = first + self.min_interval * (requests - 1);
            *next = Some(last + self.min_interval);
            last
        };

        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            trace!(wait_ms = wait.as_millis() as u64, "Rate limiting");
        }
        sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_acquires_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        let start = Instant::now();
        for _ in 0..4 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquires_are_spaced() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(200)));
        let start = Instant::now();

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(200));
        }
        assert!(times[4] - start >= Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_request_acquire_takes_one_slot_per_request() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        let start = Instant::now();

        // First request of three goes at 0, so the caller proceeds at 1s
        limiter.acquire_n(3).await;
        let first = start.elapsed();
        assert!(first >= Duration::from_secs(1) && first < Duration::from_millis(1500));

        limiter.acquire_n(3).await;
        let second = start.elapsed();
        assert!(second >= Duration::from_millis(2500) && second < Duration::from_secs(3));

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_requests_counts_as_one() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();
        limiter.acquire_n(0).await;
        limiter.acquire_n(0).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100) && elapsed < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_time_is_not_banked() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
