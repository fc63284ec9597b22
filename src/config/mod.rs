use crate::cors::CorsConfig;
use crate::error::{GatewayError, Result};
use crate::rate_limit::RateLimitConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// CORS policy configuration
    #[serde(default)]
    pub cors: CorsConfig,
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Service registry table: logical service name -> base URL
    #[serde(default)]
    pub services: HashMap<String, String>,
    /// Route definitions
    pub routes: Vec<RouteConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upstream request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Route configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Route path pattern (e.g., "/api/users/:id")
    pub path: String,
    /// Logical service name, resolved through the registry
    pub service: String,
    /// Allowed HTTP methods (if empty, all methods allowed)
    #[serde(default)]
    pub methods: Vec<String>,
    /// Whether to strip the matched prefix when forwarding
    #[serde(default)]
    pub strip_prefix: bool,
    /// Route description
    #[serde(default)]
    pub description: String,
}

/// Global authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JWT validation settings for the bearer credential
    pub jwt: JwtConfig,
}

/// JWT authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for HS256 (if using symmetric encryption)
    pub secret: Option<String>,
    /// Public key for RS256 (if using asymmetric encryption)
    pub public_key: Option<String>,
    /// Algorithm to use (HS256 or RS256)
    #[serde(default = "default_jwt_algorithm")]
    pub algorithm: String,
    /// Issuer to validate
    pub issuer: Option<String>,
    /// Audience to validate
    pub audience: Option<String>,
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    1111
}

fn default_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Validate registry entries
        for (name, url) in &self.services {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(GatewayError::Config(format!(
                    "Service URL must start with http:// or https:// for service: {}",
                    name
                )));
            }
        }

        // Validate routes
        for route in &self.routes {
            if route.path.is_empty() {
                return Err(GatewayError::InvalidRoute(
                    "Route path cannot be empty".to_string(),
                ));
            }

            if route.service.is_empty() {
                return Err(GatewayError::InvalidRoute(format!(
                    "Service name cannot be empty for route: {}",
                    route.path
                )));
            }

            if !self.services.contains_key(&route.service) {
                return Err(GatewayError::InvalidRoute(format!(
                    "Route {} names unregistered service: {}",
                    route.path, route.service
                )));
            }

            for method in &route.methods {
                let method_upper = method.to_uppercase();
                if !["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"]
                    .contains(&method_upper.as_str())
                {
                    return Err(GatewayError::InvalidRoute(format!(
                        "Invalid HTTP method '{}' for route: {}",
                        method, route.path
                    )));
                }
            }
        }

        // Validate rate limit parameters
        if self.rate_limit.capacity == 0 {
            return Err(GatewayError::Config(
                "Rate limit capacity must be > 0".to_string(),
            ));
        }
        if self.rate_limit.interval_secs == 0 {
            return Err(GatewayError::Config(
                "Rate limit interval must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
