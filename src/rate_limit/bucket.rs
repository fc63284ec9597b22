use std::time::{Duration, Instant};

/// Outcome of a token acquisition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquire {
    /// Token consumed; `remaining` is the post-decrement count
    Granted { remaining: u32 },
    /// No tokens left in the current window; `retry_after` is the time
    /// until the next window boundary
    Exhausted { retry_after: Duration },
}

/// Fixed-window token bucket.
///
/// Invariant: `0 <= tokens <= capacity`. Refill is a full reset at window
/// boundaries, not a proportional catch-up.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    refill_interval: Duration,
    tokens: u32,
    window_start: Instant,
}

impl TokenBucket {
    /// Create a full bucket whose first window starts at `now`
    pub fn new(capacity: u32, refill_interval: Duration, now: Instant) -> Self {
        Self {
            capacity,
            refill_interval,
            tokens: capacity,
            window_start: now,
        }
    }

    /// Refill if the window has rolled over, then attempt to consume one
    /// token. Callers must serialize access per bucket; the store provides
    /// that guarantee.
    pub fn try_acquire(&mut self, now: Instant) -> Acquire {
        if now.duration_since(self.window_start) >= self.refill_interval {
            self.tokens = self.capacity;
            self.window_start = now;
        }

        if self.tokens > 0 {
            self.tokens -= 1;
            Acquire::Granted {
                remaining: self.tokens,
            }
        } else {
            let elapsed = now.duration_since(self.window_start);
            Acquire::Exhausted {
                retry_after: self.refill_interval.saturating_sub(elapsed),
            }
        }
    }

    /// Tokens left in the current window
    pub fn tokens(&self) -> u32 {
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(60);

    #[test]
    fn test_remaining_decreases_to_zero() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(5, INTERVAL, start);

        for expected in [4, 3, 2, 1, 0] {
            assert_eq!(
                bucket.try_acquire(start),
                Acquire::Granted {
                    remaining: expected
                }
            );
        }
    }

    #[test]
    fn test_sixth_request_is_exhausted_with_floor_seconds() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(5, INTERVAL, start);

        for _ in 0..5 {
            bucket.try_acquire(start);
        }

        // 2s into the window: 58s (floored) until the boundary
        let result = bucket.try_acquire(start + Duration::from_secs(2));
        match result {
            Acquire::Exhausted { retry_after } => assert_eq!(retry_after.as_secs(), 58),
            other => panic!("expected exhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_no_partial_catch_up_before_boundary() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(5, INTERVAL, start);

        for _ in 0..5 {
            bucket.try_acquire(start);
        }

        // 59s in: still the same window, still empty
        let result = bucket.try_acquire(start + Duration::from_secs(59));
        match result {
            Acquire::Exhausted { retry_after } => assert_eq!(retry_after.as_secs(), 1),
            other => panic!("expected exhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_full_reset_at_window_boundary() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(5, INTERVAL, start);

        for _ in 0..5 {
            bucket.try_acquire(start);
        }

        // Past the boundary: full capacity again, not a partial refill
        assert_eq!(
            bucket.try_acquire(start + Duration::from_secs(61)),
            Acquire::Granted { remaining: 4 }
        );
    }

    #[test]
    fn test_reset_is_full_even_when_partially_drained() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(5, INTERVAL, start);

        for _ in 0..3 {
            bucket.try_acquire(start);
        }
        assert_eq!(bucket.tokens(), 2);

        assert_eq!(
            bucket.try_acquire(start + Duration::from_secs(60)),
            Acquire::Granted { remaining: 4 }
        );
    }

    #[test]
    fn test_tokens_never_exceed_capacity() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(5, INTERVAL, start);

        // Several idle windows pass; a reset must not accumulate tokens
        bucket.try_acquire(start + Duration::from_secs(300));
        assert_eq!(bucket.tokens(), 4);
    }
}
