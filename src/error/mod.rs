use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Invalid route configuration: {0}")]
    InvalidRoute(String),

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Invalid bearer token: {0}")]
    InvalidToken(String),

    #[error("Missing authentication credentials")]
    MissingCredentials,

    #[error("No instance available for service: {0}")]
    ServiceUnavailable(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InvalidRoute(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::InvalidMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            GatewayError::MissingCredentials => StatusCode::UNAUTHORIZED,
            GatewayError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
