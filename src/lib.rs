pub mod auth;
pub mod chain;
pub mod config;
pub mod cors;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod rate_limit;
pub mod registry;
pub mod router;

use crate::auth::jwt::JwtResolver;
use crate::auth::AuthenticationFilter;
use crate::chain::{Filter, FilterChain, RequestContext};
use crate::config::GatewayConfig;
use crate::cors::{CorsFilter, CorsPolicy};
use crate::error::{GatewayError, Result};
use crate::logging::LoggingFilter;
use crate::proxy::Forwarder;
use crate::rate_limit::{BucketStore, RateLimitFilter};
use crate::registry::StaticRegistry;
use crate::router::Router;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::{routing::any, Router as AxumRouter};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state handed to the request handler
#[derive(Clone)]
pub struct GatewayState {
    chain: Arc<FilterChain>,
}

/// Assemble the filter chain and the axum application from configuration.
///
/// Filter registration order here is the tie-break for equal priorities;
/// effective execution order is logging, CORS, authentication, rate
/// limiting, then the forwarder.
pub fn build_router(config: GatewayConfig) -> Result<AxumRouter> {
    config.validate()?;

    let router = Router::new(config.routes)?;
    info!("Loaded {} routes", router.routes().len());

    let registry = Arc::new(StaticRegistry::new(config.services));
    let forwarder = Forwarder::new(
        Arc::new(router),
        registry,
        Duration::from_secs(config.server.timeout_secs),
    )?;

    let resolver = Arc::new(JwtResolver::new(&config.auth.jwt)?);
    let policy = Arc::new(CorsPolicy::new(&config.cors)?);
    let store = Arc::new(BucketStore::new(&config.rate_limit));

    let filters: Vec<Arc<dyn Filter>> = vec![
        Arc::new(LoggingFilter::new()),
        Arc::new(CorsFilter::new(policy)),
        Arc::new(AuthenticationFilter::new(resolver)),
        Arc::new(RateLimitFilter::new(store)),
    ];
    let chain = FilterChain::new(filters, Arc::new(forwarder));

    let state = GatewayState {
        chain: Arc::new(chain),
    };

    Ok(AxumRouter::new()
        .route("/*path", any(gateway_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http()))
}

/// Entry point for every request: buffer the body, run the chain
pub async fn gateway_handler(State(state): State<GatewayState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();

    let body_bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return GatewayError::Internal(format!("Failed to read request body: {}", e))
                .into_response()
        }
    };

    let ctx = RequestContext::new(parts.method, parts.uri, parts.headers, body_bytes);
    state.chain.execute(ctx).await
}

/// Initialize the gateway server
pub async fn init_gateway(config: GatewayConfig) -> Result<()> {
    info!("Starting API gateway");
    info!(
        "Server listening on {}:{}",
        config.server.host, config.server.port
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = build_router(config)?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(GatewayError::Io)?;

    info!("Gateway ready to accept connections");

    axum::serve(listener, app)
        .await
        .map_err(|e| GatewayError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edgegate=debug,tower_http=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();
}
