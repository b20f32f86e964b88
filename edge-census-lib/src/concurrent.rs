//! Admission control for network operations.
//!
//! Every page fetch and every DNS lookup takes one token from a shared
//! [`AdmissionLimiter`] before touching the network and gives it back when it
//! finishes, whatever the outcome. The limiter is phase-agnostic: the same
//! instance gates fetching and resolution.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A counting semaphore bounding simultaneous network operations.
///
/// Cloning is cheap and every clone shares the same token pool.
#[derive(Debug, Clone)]
pub struct AdmissionLimiter {
    permits: Arc<Semaphore>,
    capacity: usize,
    stats: Arc<Stats>,
}

#[derive(Debug, Default)]
struct Stats {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl AdmissionLimiter {
    /// Create a limiter with `capacity` tokens (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            stats: Arc::new(Stats::default()),
        }
    }

    /// Wait until a token is free and take it.
    ///
    /// The semaphore is never closed while a limiter handle exists, so this
    /// cannot fail.
    pub async fn acquire(&self) -> AdmissionToken {
        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("admission semaphore is never closed"),
        };

        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(now, Ordering::SeqCst);

        AdmissionToken {
            _permit: permit,
            stats: Arc::clone(&self.stats),
        }
    }

    /// Configured number of tokens.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Tokens currently held.
    pub fn in_flight(&self) -> usize {
        self.stats.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of tokens ever held at the same time.
    pub fn peak(&self) -> usize {
        self.stats.peak.load(Ordering::SeqCst)
    }
}

/// One unit of admission. Dropping it returns the token to the pool.
#[derive(Debug)]
#[must_use = "dropping the token immediately releases it"]
pub struct AdmissionToken {
    _permit: OwnedSemaphorePermit,
    stats: Arc<Stats>,
}

impl AdmissionToken {
    /// Return the token explicitly. Equivalent to dropping it.
    pub fn release(self) {}
}

impl Drop for AdmissionToken {
    fn drop(&mut self) {
        // Runs before the permit field is dropped: `in_flight` never exceeds
        // the number of permits the semaphore has handed out.
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_zero_capacity_becomes_one() {
        let limiter = AdmissionLimiter::new(0);
        assert_eq!(limiter.capacity(), 1);
        let token = limiter.acquire().await;
        assert_eq!(limiter.available(), 0);
        token.release();
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn test_acquire_blocks_when_saturated() {
        let limiter = AdmissionLimiter::new(1);
        let held = limiter.acquire().await;

        let waiting = tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(waiting.is_err(), "second acquire should wait while cap is reached");

        drop(held);
        let token = tokio::time::timeout(Duration::from_millis(500), limiter.acquire())
            .await
            .expect("token should be free after release");
        assert_eq!(limiter.in_flight(), 1);
        drop(token);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_peak_never_exceeds_capacity() {
        let limiter = AdmissionLimiter::new(3);
        let mut tasks = tokio::task::JoinSet::new();

        for _ in 0..40 {
            let limiter = limiter.clone();
            tasks.spawn(async move {
                let _token = limiter.acquire().await;
                assert!(limiter.in_flight() <= limiter.capacity());
                tokio::time::sleep(Duration::from_millis(2)).await;
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }

        assert!(limiter.peak() <= 3);
        assert!(limiter.peak() >= 1);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.available(), 3);
    }

    #[tokio::test]
    async fn test_clones_share_the_pool() {
        let limiter = AdmissionLimiter::new(2);
        let other = limiter.clone();
        let _a = limiter.acquire().await;
        let _b = other.acquire().await;
        assert_eq!(limiter.available(), 0);
        assert_eq!(other.in_flight(), 2);
    }
}
