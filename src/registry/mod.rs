use crate::error::{GatewayError, Result};
use std::collections::HashMap;
use tracing::debug;

/// Service discovery collaborator.
///
/// Maps a logical service name to a live base URL. Resolution happens per
/// request at forward time, so a registry whose view changes starts
/// serving new instances without a gateway restart.
#[async_trait::async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Resolve a service name to a base URL, or fail when no instance is
    /// available
    async fn resolve(&self, service: &str) -> Result<String>;
}

/// Registry backed by the static service table from configuration.
///
/// Stands in for an external discovery server; the trait is the seam where
/// a live client would plug in.
pub struct StaticRegistry {
    services: HashMap<String, String>,
}

impl StaticRegistry {
    pub fn new(services: HashMap<String, String>) -> Self {
        Self { services }
    }
}

#[async_trait::async_trait]
impl ServiceRegistry for StaticRegistry {
    async fn resolve(&self, service: &str) -> Result<String> {
        match self.services.get(service) {
            Some(url) => {
                debug!(service, url = %url, "Resolved service");
                Ok(url.clone())
            }
            None => Err(GatewayError::ServiceUnavailable(service.to_string())),
        }
    }
}
