use super::CorsPolicy;
use crate::chain::{Filter, Next, RequestContext};
use crate::error::Result;
use bytes::Bytes;
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_METHOD,
};
use http::{HeaderValue, Method, StatusCode};
use std::sync::Arc;
use tracing::{debug, warn};

/// CORS filter.
///
/// Runs before authentication so preflights are answered without
/// credentials. Preflights short-circuit; other requests are forwarded and
/// the response is decorated with the allow-origin header when the origin
/// is in the allow-list.
pub struct CorsFilter {
    policy: Arc<CorsPolicy>,
}

impl CorsFilter {
    pub const ORDER: i32 = 0;

    pub fn new(policy: Arc<CorsPolicy>) -> Self {
        Self { policy }
    }

    fn is_preflight(ctx: &RequestContext) -> bool {
        ctx.method() == Method::OPTIONS
            && ctx.origin().is_some()
            && ctx.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD)
    }
}

#[async_trait::async_trait]
impl Filter for CorsFilter {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn order(&self) -> i32 {
        Self::ORDER
    }

    async fn process(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<()> {
        let origin = ctx.origin().map(str::to_string);

        if Self::is_preflight(ctx) {
            let origin = origin.unwrap_or_default();

            if self.policy.is_origin_allowed(&origin) {
                debug!(request_id = %ctx.id(), origin = %origin, "Answering CORS preflight");

                let allow_origin = self.policy.allow_origin_value(&origin);
                let headers = &mut ctx.response_mut().headers;
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
                headers.insert(
                    ACCESS_CONTROL_ALLOW_METHODS,
                    self.policy.allow_methods().clone(),
                );
                headers.insert(
                    ACCESS_CONTROL_ALLOW_HEADERS,
                    self.policy.allow_headers().clone(),
                );
                headers.insert(ACCESS_CONTROL_MAX_AGE, self.policy.max_age().clone());
                if self.policy.allow_credentials() {
                    headers.insert(
                        ACCESS_CONTROL_ALLOW_CREDENTIALS,
                        HeaderValue::from_static("true"),
                    );
                }

                ctx.short_circuit(StatusCode::NO_CONTENT, Bytes::new());
            } else {
                warn!(request_id = %ctx.id(), origin = %origin, "Rejecting CORS preflight from disallowed origin");
                // No Access-Control-* headers: the browser blocks the call
                ctx.short_circuit(StatusCode::FORBIDDEN, Bytes::new());
            }

            return Ok(());
        }

        let result = next.run(ctx).await;

        // Decorate the response for allowed origins, including error
        // responses, so browser clients can read the status. Disallowed
        // origins get no allow-origin header and are left to the client's
        // origin policy.
        if let Some(origin) = origin {
            if self.policy.is_origin_allowed(&origin) {
                let allow_origin = self.policy.allow_origin_value(&origin);
                let headers = &mut ctx.response_mut().headers;
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
                if self.policy.allow_credentials() {
                    headers.insert(
                        ACCESS_CONTROL_ALLOW_CREDENTIALS,
                        HeaderValue::from_static("true"),
                    );
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{FilterChain, Handler};
    use crate::cors::CorsConfig;
    use http::HeaderMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct ProbeHandler {
        reached: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl Handler for ProbeHandler {
        async fn handle(&self, ctx: &mut RequestContext) -> Result<()> {
            self.reached.store(true, Ordering::SeqCst);
            ctx.response_mut().status = StatusCode::OK;
            Ok(())
        }
    }

    fn chain(config: CorsConfig, reached: Arc<AtomicBool>) -> FilterChain {
        let policy = Arc::new(CorsPolicy::new(&config).unwrap());
        FilterChain::new(
            vec![Arc::new(CorsFilter::new(policy))],
            Arc::new(ProbeHandler { reached }),
        )
    }

    fn preflight(origin: &str) -> RequestContext {
        let mut headers = HeaderMap::new();
        headers.insert("Origin", HeaderValue::from_str(origin).unwrap());
        headers.insert(
            "Access-Control-Request-Method",
            HeaderValue::from_static("POST"),
        );
        RequestContext::new(
            Method::OPTIONS,
            "/api/users".parse().unwrap(),
            headers,
            Bytes::new(),
        )
    }

    fn simple_request(origin: Option<&str>) -> RequestContext {
        let mut headers = HeaderMap::new();
        if let Some(origin) = origin {
            headers.insert("Origin", HeaderValue::from_str(origin).unwrap());
        }
        RequestContext::new(
            Method::GET,
            "/api/users".parse().unwrap(),
            headers,
            Bytes::new(),
        )
    }

    #[tokio::test]
    async fn test_preflight_from_allowed_origin() {
        let reached = Arc::new(AtomicBool::new(false));
        let chain = chain(
            CorsConfig::restrictive(vec!["http://localhost:8080".to_string()]),
            reached.clone(),
        );

        let response = chain.execute(preflight("http://localhost:8080")).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response
                .headers()
                .get("Access-Control-Allow-Origin")
                .unwrap(),
            "http://localhost:8080"
        );
        assert!(response
            .headers()
            .get("Access-Control-Allow-Methods")
            .is_some());
        assert_eq!(
            response
                .headers()
                .get("Access-Control-Allow-Credentials")
                .unwrap(),
            "true"
        );
        // Preflight never reaches the rest of the chain
        assert!(!reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_preflight_from_disallowed_origin() {
        let reached = Arc::new(AtomicBool::new(false));
        let chain = chain(
            CorsConfig::restrictive(vec!["http://localhost:8080".to_string()]),
            reached.clone(),
        );

        let response = chain.execute(preflight("http://evil.example.com")).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response
            .headers()
            .get("Access-Control-Allow-Origin")
            .is_none());
        assert!(!reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_simple_request_allowed_origin_is_decorated() {
        let reached = Arc::new(AtomicBool::new(false));
        let chain = chain(
            CorsConfig::restrictive(vec!["http://localhost:8080".to_string()]),
            reached.clone(),
        );

        let response = chain
            .execute(simple_request(Some("http://localhost:8080")))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("Access-Control-Allow-Origin")
                .unwrap(),
            "http://localhost:8080"
        );
        assert!(reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_simple_request_disallowed_origin_forwarded_undecorated() {
        let reached = Arc::new(AtomicBool::new(false));
        let chain = chain(
            CorsConfig::restrictive(vec!["http://localhost:8080".to_string()]),
            reached.clone(),
        );

        let response = chain
            .execute(simple_request(Some("http://evil.example.com")))
            .await;

        // Forwarded, but no allow-origin header for the browser
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get("Access-Control-Allow-Origin")
            .is_none());
        assert!(reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_options_without_request_method_is_not_preflight() {
        let reached = Arc::new(AtomicBool::new(false));
        let chain = chain(CorsConfig::default(), reached.clone());

        let mut headers = HeaderMap::new();
        headers.insert("Origin", HeaderValue::from_static("http://localhost:8080"));
        let ctx = RequestContext::new(
            Method::OPTIONS,
            "/api/users".parse().unwrap(),
            headers,
            Bytes::new(),
        );

        chain.execute(ctx).await;
        assert!(reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_wildcard_origin_uses_star() {
        let reached = Arc::new(AtomicBool::new(false));
        let chain = chain(CorsConfig::default(), reached.clone());

        let response = chain
            .execute(simple_request(Some("http://anywhere.example.com")))
            .await;

        assert_eq!(
            response
                .headers()
                .get("Access-Control-Allow-Origin")
                .unwrap(),
            "*"
        );
    }
}
