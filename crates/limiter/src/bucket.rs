//! Token bucket for rate limiting

use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
    last_used: Instant,
}

/// Continuously refilling token bucket
///
/// Starts full. A request is allowed iff a whole token is available, and
/// that token is consumed under the same lock that observed it.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a bucket holding `capacity` tokens, refilled at `refill_rate`
    /// tokens per second
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        let now = Instant::now();
        Self {
            capacity: f64::from(capacity),
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_refill: now,
                last_used: now,
            }),
        }
    }

    /// Try to take one token
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub(crate) fn try_acquire_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state, now);
        state.last_used = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently available
    pub fn available_tokens(&self) -> usize {
        let mut state = self.state.lock();
        self.refill(&mut state, Instant::now());
        state.tokens as usize
    }

    /// Time since the bucket was last asked for a token
    pub fn idle_for(&self) -> Duration {
        self.state.lock().last_used.elapsed()
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        state.last_refill = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_reject() {
        let bucket = TokenBucket::new(3, 0.0);
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
        assert_eq!(bucket.available_tokens(), 0);
    }

    #[test]
    fn test_refill_over_time() {
        let bucket = TokenBucket::new(2, 1.0);
        let start = Instant::now();
        assert!(bucket.try_acquire_at(start));
        assert!(bucket.try_acquire_at(start));
        assert!(!bucket.try_acquire_at(start));

        // One second refills one token
        let later = start + Duration::from_secs(1);
        assert!(bucket.try_acquire_at(later));
        assert!(!bucket.try_acquire_at(later));

        // Refill is capped at capacity
        let much_later = later + Duration::from_secs(60);
        assert!(bucket.try_acquire_at(much_later));
        assert!(bucket.try_acquire_at(much_later));
        assert!(!bucket.try_acquire_at(much_later));
    }
}
