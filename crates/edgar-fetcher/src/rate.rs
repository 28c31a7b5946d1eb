//! The rate budget shared by every in-flight fetch.
//!
//! Ported from the teacher's `RateLimiter` in `rate_limiter.rs` (same
//! constructor-preset idiom: `sec_edgar()`, a `wait_for_permit`-style entry
//! point) but generalized from `governor`'s GCRA quota to the exact
//! algorithm spec.md section 4.1 specifies: a single lock holding the last
//! call's `Instant`, a sleep for `max(0, 1/rate - elapsed)`, and a
//! `Semaphore` bounding in-flight requests to `2 * rate`. `governor` does
//! not expose that literal "sleep until legal instant" primitive, so this
//! module implements it directly against `tokio::sync::{Mutex, Semaphore}`.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tracing::debug;

/// Guards one in-flight request's share of the burst semaphore. Dropping it
/// releases the permit back to the budget.
pub struct RatePermit<'a> {
    _permit: SemaphorePermit<'a>,
}

/// A process-wide resource: one token-interval lock plus a burst semaphore.
/// Cloning is cheap (an `Arc` of shared state), matching spec.md section 5's
/// requirement that the rate budget be a single shared resource guarded by
/// one lock and one semaphore, held the minimum time necessary.
#[derive(Clone)]
pub struct RateBudget {
    last_call: Arc<Mutex<Option<Instant>>>,
    interval: Duration,
    burst: Arc<Semaphore>,
}

impl RateBudget {
    /// `rate` requests/sec; burst capacity is `2 * rate` in-flight requests.
    pub fn new(rate: f64) -> Self {
        let interval = Duration::from_secs_f64(1.0 / rate);
        let burst_capacity = ((rate * 2.0).ceil() as usize).max(1);
        RateBudget {
            last_call: Arc::new(Mutex::new(None)),
            interval,
            burst: Arc::new(Semaphore::new(burst_capacity)),
        }
    }

    /// The default SEC EDGAR budget from spec.md section 4.1: 8 requests/sec.
    pub fn sec_edgar() -> Self {
        Self::new(8.0)
    }

    /// Acquires a burst-semaphore permit, then serializes on the token-rate
    /// lock: sleeps for whatever remains of the current interval, then
    /// records a new last-call instant. Returns a guard whose drop releases
    /// the burst permit; the token-rate spacing itself is never released
    /// early since it reflects elapsed wall-clock time, not a held lock.
    pub async fn acquire(&self) -> RatePermit<'_> {
        let permit = self
            .burst
            .acquire()
            .await
            .expect("rate budget semaphore is never closed");

        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let wait = self.interval - elapsed;
                debug!("rate limit reached, waiting {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }
        *last_call = Some(Instant::now());

        debug!("rate limit permit granted");
        RatePermit { _permit: permit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spaces_out_successive_acquisitions() {
        let budget = RateBudget::new(10.0); // 100ms interval
        let start = Instant::now();
        let _first = budget.acquire().await;
        let _second = budget.acquire().await;
        let _third = budget.acquire().await;
        // Two intervals have elapsed by the third acquisition.
        assert!(start.elapsed() >= Duration::from_millis(180));
    }

    #[tokio::test]
    async fn burst_bound_limits_concurrent_permits() {
        let budget = RateBudget::new(1.0); // burst capacity 2
        let _a = budget.acquire().await;
        let available = budget.burst.available_permits();
        assert_eq!(available, 1);
    }
}
