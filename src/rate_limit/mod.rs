//! Per-principal rate limiting
//!
//! Fixed-window token bucket: each principal gets `capacity` tokens per
//! `interval`, replenished by a full reset at interval boundaries — no
//! continuous trickle, and a late check never catches up partial intervals.
//!
//! State lives in [`BucketStore`], a concurrent keyed registry with one
//! bucket per principal, created lazily on first request. Fetch-or-create
//! and check-and-decrement execute as one per-key critical section, so
//! concurrent first requests never observe two buckets and two requests
//! never both spend the last token.
//!
//! Consumption is pay-on-attempt: a token spent for a request that is later
//! cancelled stays spent.

pub mod bucket;
pub mod filter;
pub mod store;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use bucket::{Acquire, TokenBucket};
pub use filter::RateLimitFilter;
pub use store::BucketStore;

/// Rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum number of requests per window
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Window length in seconds
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

fn default_capacity() -> u32 {
    5
}

fn default_interval() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            interval_secs: default_interval(),
        }
    }
}

impl RateLimitConfig {
    /// Get the window as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
