pub mod jwt;

use crate::chain::{Filter, Next, RequestContext};
use crate::error::{GatewayError, Result};
use http::HeaderMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Identifier of an authenticated caller, derived from a validated
/// credential. Opaque to the gateway; immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Credential-validation collaborator.
///
/// The gateway hands over the raw bearer credential; the resolver owns
/// signature and claim validation against the issuer.
#[async_trait::async_trait]
pub trait PrincipalResolver: Send + Sync {
    /// Validate a bearer credential and yield the caller's principal
    async fn resolve(&self, credential: &str) -> Result<Principal>;
}

/// Authentication gate.
///
/// Runs after CORS and before the rate limiter, so unauthenticated traffic
/// never touches bucket state. Missing or invalid credentials reject the
/// request with 401 without invoking the rest of the chain.
pub struct AuthenticationFilter {
    resolver: Arc<dyn PrincipalResolver>,
}

impl AuthenticationFilter {
    pub const ORDER: i32 = 1;

    pub fn new(resolver: Arc<dyn PrincipalResolver>) -> Self {
        Self { resolver }
    }

    /// Extract the bearer credential from the Authorization header
    fn extract_credential(headers: &HeaderMap) -> Result<&str> {
        let auth_header = headers
            .get("authorization")
            .ok_or(GatewayError::MissingCredentials)?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| GatewayError::InvalidToken("Invalid authorization header".to_string()))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            Ok(token)
        } else if let Some(token) = auth_str.strip_prefix("bearer ") {
            Ok(token)
        } else {
            Err(GatewayError::InvalidToken(
                "Authorization header must start with 'Bearer '".to_string(),
            ))
        }
    }
}

#[async_trait::async_trait]
impl Filter for AuthenticationFilter {
    fn name(&self) -> &'static str {
        "authentication"
    }

    fn order(&self) -> i32 {
        Self::ORDER
    }

    async fn process(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<()> {
        let credential = Self::extract_credential(ctx.headers())?.to_string();

        match self.resolver.resolve(&credential).await {
            Ok(principal) => {
                info!(request_id = %ctx.id(), principal = %principal, "Authentication successful");
                ctx.set_principal(principal);
                next.run(ctx).await
            }
            Err(e) => {
                warn!(request_id = %ctx.id(), error = %e, "Authentication failed");
                Err(e)
            }
        }
    }
}
