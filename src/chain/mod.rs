//! Filter chain engine
//!
//! The gateway's request path is an ordered pipeline of filters in front of
//! a terminal handler. Each filter receives the [`RequestContext`] and a
//! [`Next`] continuation for the remaining chain, and may:
//!
//! - call `next.run(ctx).await` and post-process after it returns (wrap
//!   pattern: first inbound means last outbound), or
//! - populate the context's response slot and return without calling `next`
//!   ("short-circuit", e.g. 401/403/429).
//!
//! Filters are sorted once at construction, ascending by [`Filter::order`],
//! with registration order as the stable tie-break. Errors escaping any
//! filter are caught at [`FilterChain::execute`] and converted into an HTTP
//! response; the chain never propagates an error to its caller.

pub mod context;

use crate::error::Result;
use axum::response::Response;
use std::sync::Arc;
use tracing::{error, warn};

pub use context::RequestContext;

/// A single request/response interceptor in the chain.
///
/// Implementations must be cheap to share: one instance serves all
/// in-flight requests concurrently.
#[async_trait::async_trait]
pub trait Filter: Send + Sync {
    /// Filter name used in log records
    fn name(&self) -> &'static str;

    /// Relative execution priority; lower runs first on the inbound path
    fn order(&self) -> i32;

    /// Process the request, either delegating to `next` or short-circuiting
    async fn process(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<()>;
}

/// Terminal handler invoked when every filter has delegated
#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &mut RequestContext) -> Result<()>;
}

/// Continuation over the remaining filters plus the terminal handler
pub struct Next<'a> {
    filters: &'a [Arc<dyn Filter>],
    handler: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Invoke the rest of the chain
    pub async fn run(self, ctx: &mut RequestContext) -> Result<()> {
        match self.filters.split_first() {
            Some((filter, rest)) => {
                filter
                    .process(
                        ctx,
                        Next {
                            filters: rest,
                            handler: self.handler,
                        },
                    )
                    .await
            }
            None => self.handler.handle(ctx).await,
        }
    }
}

/// Ordered, immutable filter pipeline built once at startup
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
    handler: Arc<dyn Handler>,
}

impl FilterChain {
    /// Build a chain from registered filters and a terminal handler.
    ///
    /// Sorting is stable, so filters with equal order keep their
    /// registration order.
    pub fn new(mut filters: Vec<Arc<dyn Filter>>, handler: Arc<dyn Handler>) -> Self {
        filters.sort_by_key(|f| f.order());
        Self { filters, handler }
    }

    /// Names of the filters in execution order
    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run the request through the chain and produce the response.
    ///
    /// This is the chain boundary: any error a filter or the handler
    /// returns is mapped to its HTTP status here. Internal faults become
    /// 500 without affecting other in-flight requests.
    pub async fn execute(&self, mut ctx: RequestContext) -> Response {
        let next = Next {
            filters: &self.filters,
            handler: self.handler.as_ref(),
        };

        if let Err(err) = next.run(&mut ctx).await {
            let status = err.status_code();
            if status.is_server_error() {
                error!(request_id = %ctx.id(), error = %err, status = status.as_u16(), "Request failed");
            } else {
                warn!(request_id = %ctx.id(), error = %err, status = status.as_u16(), "Request rejected");
            }
            ctx.fail(&err);
        }

        ctx.into_response()
    }
}
