//! Error responses for the forwarding handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::warn;

/// Extension trait for concise error mapping on upstream results.
pub trait ResultExt<T> {
    fn upstream_err(self, endpoint: &str) -> Result<T, ProxyError>;
}

impl<T> ResultExt<T> for Result<T, reqwest::Error> {
    fn upstream_err(self, endpoint: &str) -> Result<T, ProxyError> {
        self.map_err(|e| ProxyError::upstream(endpoint, &e))
    }
}

/// Failures of the forwarding shim itself. Upstream HTTP errors are not
/// `ProxyError`s; their status and body are mirrored unchanged.
#[derive(Debug)]
pub enum ProxyError {
    BadGateway(String),
    GatewayTimeout(String),
    BadRequest(String),
}

impl ProxyError {
    pub fn upstream(endpoint: &str, e: &reqwest::Error) -> Self {
        warn!(endpoint = %endpoint, error = %e, "Upstream auth call failed");
        if e.is_timeout() {
            Self::GatewayTimeout("Authentication service timed out".into())
        } else {
            Self::BadGateway("Authentication service unavailable".into())
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ProxyError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ProxyError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            ProxyError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
