use crate::chain::{Filter, Next, RequestContext};
use crate::error::Result;
use std::time::Instant;
use tracing::info;

/// Observational logging filter.
///
/// First inbound, last outbound (order −1). Records method and URI before
/// the chain runs and the final status after the entire downstream chain,
/// including the upstream call, completes. Never short-circuits and never
/// mutates the request or response.
#[derive(Default)]
pub struct LoggingFilter;

impl LoggingFilter {
    pub const ORDER: i32 = -1;

    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Filter for LoggingFilter {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn order(&self) -> i32 {
        Self::ORDER
    }

    async fn process(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<()> {
        info!(
            request_id = %ctx.id(),
            method = %ctx.method(),
            uri = %ctx.uri(),
            "Incoming request"
        );
        let started = Instant::now();

        let result = next.run(ctx).await;

        // On an error the chain boundary has not mapped a response yet;
        // log the status the error will become, then let it propagate.
        let status = match &result {
            Ok(()) => ctx.response().status,
            Err(err) => err.status_code(),
        };

        info!(
            request_id = %ctx.id(),
            status = status.as_u16(),
            latency_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Outgoing response"
        );

        result
    }
}
