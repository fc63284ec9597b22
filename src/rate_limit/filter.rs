use super::bucket::Acquire;
use super::store::BucketStore;
use crate::chain::{Filter, Next, RequestContext};
use crate::error::{GatewayError, Result};
use bytes::Bytes;
use http::header::{CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderValue, StatusCode};
use std::sync::Arc;
use tracing::{debug, warn};

/// Rate limiting filter, keyed by the authenticated principal.
///
/// Must run after the authentication gate; the chain ordering guarantees a
/// principal is present by the time this filter executes.
pub struct RateLimitFilter {
    store: Arc<BucketStore>,
}

impl RateLimitFilter {
    pub const ORDER: i32 = 2;

    pub fn new(store: Arc<BucketStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Filter for RateLimitFilter {
    fn name(&self) -> &'static str {
        "rate-limit"
    }

    fn order(&self) -> i32 {
        Self::ORDER
    }

    async fn process(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<()> {
        let principal = ctx.principal().cloned().ok_or_else(|| {
            GatewayError::Internal("rate limiter reached without authenticated principal".to_string())
        })?;

        match self.store.try_acquire(principal.as_str()) {
            Acquire::Granted { remaining } => {
                debug!(request_id = %ctx.id(), principal = %principal, remaining, "Rate limit check passed");
                ctx.response_mut()
                    .headers
                    .insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
                next.run(ctx).await
            }
            Acquire::Exhausted { retry_after } => {
                let seconds = retry_after.as_secs();
                warn!(request_id = %ctx.id(), principal = %principal, retry_after_secs = seconds, "Rate limit exceeded");

                ctx.response_mut()
                    .headers
                    .insert(RETRY_AFTER, HeaderValue::from(seconds));
                ctx.response_mut()
                    .headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

                let body = serde_json::json!({
                    "error": "Too Many Requests",
                    "retryAfter": format!("{}s", seconds),
                });
                ctx.short_circuit(StatusCode::TOO_MANY_REQUESTS, Bytes::from(body.to_string()));
                Ok(())
            }
        }
    }
}
