use crate::chain::{Handler, RequestContext};
use crate::error::{GatewayError, Result};
use crate::registry::ServiceRegistry;
use crate::router::Router;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Terminal handler of the filter chain: matches the route, resolves the
/// service through the registry and forwards the request upstream.
pub struct Forwarder {
    router: Arc<Router>,
    registry: Arc<dyn ServiceRegistry>,
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new(
        router: Arc<Router>,
        registry: Arc<dyn ServiceRegistry>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            router,
            registry,
            client,
        })
    }
}

#[async_trait::async_trait]
impl Handler for Forwarder {
    async fn handle(&self, ctx: &mut RequestContext) -> Result<()> {
        let route_match = self.router.match_route(ctx.path(), ctx.method())?;
        let base_url = self.registry.resolve(&route_match.route.service).await?;

        let mut upstream_url = route_match.build_upstream_url(&base_url, ctx.path());
        if let Some(query) = ctx.query() {
            upstream_url.push('?');
            upstream_url.push_str(query);
        }

        debug!(
            request_id = %ctx.id(),
            service = %route_match.route.service,
            upstream_url = %upstream_url,
            "Forwarding to upstream"
        );

        let upstream = send_request(
            &self.client,
            ctx.method().clone(),
            ctx.headers().clone(),
            ctx.body().clone(),
            &upstream_url,
        )
        .await?;

        // Merge over the slot so headers set by filters on the way in
        // (rate-limit, CORS) survive alongside the upstream's headers.
        let slot = ctx.response_mut();
        slot.status = upstream.status;
        for (name, value) in upstream.headers.iter() {
            slot.headers.insert(name.clone(), value.clone());
        }
        slot.body = upstream.body;

        Ok(())
    }
}

struct UpstreamResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

/// Send the request to the upstream service
async fn send_request(
    client: &reqwest::Client,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
    upstream_url: &str,
) -> Result<UpstreamResponse> {
    let mut upstream_req = client.request(method, upstream_url).body(body.to_vec());

    // Forward headers, excluding hop-by-hop headers
    for (name, value) in headers.iter() {
        if !is_hop_by_hop_header(name.as_str()) {
            upstream_req = upstream_req.header(name, value);
        }
    }

    let upstream_response = upstream_req.send().await.map_err(|e| {
        if e.is_timeout() {
            GatewayError::Timeout(format!("Upstream request timed out: {}", e))
        } else if e.is_connect() {
            GatewayError::Upstream(format!("Failed to connect to upstream: {}", e))
        } else {
            GatewayError::Upstream(format!("Upstream request failed: {}", e))
        }
    })?;

    let status = upstream_response.status();

    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream_response.headers().iter() {
        if !is_hop_by_hop_header(name.as_str()) {
            response_headers.insert(name.clone(), value.clone());
        }
    }

    let body = upstream_response
        .bytes()
        .await
        .map_err(|e| GatewayError::Upstream(format!("Failed to read upstream response: {}", e)))?;

    Ok(UpstreamResponse {
        status,
        headers: response_headers,
        body,
    })
}

/// Check if a header is a hop-by-hop header that should not be forwarded
fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}
