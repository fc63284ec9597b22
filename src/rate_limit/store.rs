use super::bucket::{Acquire, TokenBucket};
use super::RateLimitConfig;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Concurrent keyed registry of rate-limit state, one bucket per principal.
///
/// Buckets are created lazily on first request and live until process
/// shutdown; entries are never evicted. Correctness rests on the combined
/// fetch-or-create and check-and-decrement being indivisible per key, not
/// on the container type: `entry()` holds the shard write lock for the
/// duration of both steps. Buckets for different principals do not share a
/// lock beyond their shard.
pub struct BucketStore {
    buckets: DashMap<String, TokenBucket>,
    capacity: u32,
    refill_interval: Duration,
}

impl BucketStore {
    /// Create an empty store with the given limits
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity: config.capacity,
            refill_interval: config.interval(),
        }
    }

    /// Attempt to consume one token for `key` at the current time
    pub fn try_acquire(&self, key: &str) -> Acquire {
        self.try_acquire_at(key, Instant::now())
    }

    /// Attempt to consume one token for `key` as observed at `now`
    pub fn try_acquire_at(&self, key: &str, now: Instant) -> Acquire {
        let mut bucket = self.buckets.entry(key.to_string()).or_insert_with(|| {
            debug!("Creating bucket for principal: {}", key);
            TokenBucket::new(self.capacity, self.refill_interval, now)
        });

        bucket.try_acquire(now)
    }

    /// Number of live buckets (for testing/monitoring)
    pub fn active_buckets(&self) -> usize {
        self.buckets.len()
    }
}
