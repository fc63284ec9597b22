pub mod filter;

use crate::error::{GatewayError, Result};
use http::HeaderValue;
use serde::{Deserialize, Serialize};

pub use filter::CorsFilter;

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins (use ["*"] for all origins)
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,
    /// Allowed HTTP methods
    #[serde(default = "default_methods")]
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    #[serde(default = "default_headers")]
    pub allowed_headers: Vec<String>,
    /// Allow credentials
    #[serde(default)]
    pub allow_credentials: bool,
    /// Max age for preflight cache in seconds
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
}

fn default_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_methods() -> Vec<String> {
    vec![
        "GET".to_string(),
        "POST".to_string(),
        "PUT".to_string(),
        "DELETE".to_string(),
        "PATCH".to_string(),
        "OPTIONS".to_string(),
    ]
}

fn default_headers() -> Vec<String> {
    vec!["Content-Type".to_string(), "Authorization".to_string()]
}

fn default_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
            allowed_methods: default_methods(),
            allowed_headers: default_headers(),
            allow_credentials: false,
            max_age_secs: default_max_age(),
        }
    }
}

impl CorsConfig {
    /// Restrictive configuration: specific origins, credentials allowed
    pub fn restrictive(origins: Vec<String>) -> Self {
        Self {
            allowed_origins: origins,
            allow_credentials: true,
            ..Default::default()
        }
    }
}

/// Stateless CORS rule evaluator, compiled once at startup.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_any_origin: bool,
    allowed_origins: Vec<String>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    allow_credentials: bool,
    max_age: HeaderValue,
}

impl CorsPolicy {
    /// Compile the configuration, rejecting values that cannot appear in
    /// response headers
    pub fn new(config: &CorsConfig) -> Result<Self> {
        let allow_any_origin = config.allowed_origins.iter().any(|o| o == "*");

        let allow_methods = HeaderValue::from_str(&config.allowed_methods.join(", "))
            .map_err(|e| GatewayError::Config(format!("Invalid CORS method list: {}", e)))?;
        let allow_headers = HeaderValue::from_str(&config.allowed_headers.join(", "))
            .map_err(|e| GatewayError::Config(format!("Invalid CORS header list: {}", e)))?;

        for origin in &config.allowed_origins {
            HeaderValue::from_str(origin)
                .map_err(|e| GatewayError::Config(format!("Invalid CORS origin value: {}", e)))?;
        }

        Ok(Self {
            allow_any_origin,
            allowed_origins: config.allowed_origins.clone(),
            allow_methods,
            allow_headers,
            allow_credentials: config.allow_credentials,
            max_age: HeaderValue::from(config.max_age_secs),
        })
    }

    /// Whether the given `Origin` value may make cross-origin requests
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allow_any_origin || self.allowed_origins.iter().any(|o| o == origin)
    }

    /// The `Access-Control-Allow-Origin` value to echo for an allowed
    /// origin. With credentials enabled the concrete origin is echoed;
    /// a literal `*` is only valid without credentials.
    pub fn allow_origin_value(&self, origin: &str) -> HeaderValue {
        if self.allow_any_origin && !self.allow_credentials {
            HeaderValue::from_static("*")
        } else {
            HeaderValue::from_str(origin).unwrap_or_else(|_| HeaderValue::from_static("*"))
        }
    }

    pub fn allow_methods(&self) -> &HeaderValue {
        &self.allow_methods
    }

    pub fn allow_headers(&self) -> &HeaderValue {
        &self.allow_headers
    }

    pub fn allow_credentials(&self) -> bool {
        self.allow_credentials
    }

    pub fn max_age(&self) -> &HeaderValue {
        &self.max_age
    }
}
