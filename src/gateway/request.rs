//! Outbound request and inbound response descriptions.

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Marker header set on a request replayed after a session refresh.
/// A 401 on a request carrying it is terminal.
pub const RETRIED_HEADER: &str = "x-retried-401";

/// Session refresh endpoint. Never itself triggers a refresh cycle.
pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const REGISTER_PATH: &str = "/api/auth/register";

/// A pending API call: target, method, headers and body.
///
/// The request is cheap to clone (`Bytes` body) so the interceptor can replay it.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path and optional query, resolved against the API base URL.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(body)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Path without the query string.
    pub fn route(&self) -> &str {
        self.path
            .split_once('?')
            .map_or(self.path.as_str(), |(route, _)| route)
    }

    /// Whether this request targets the refresh endpoint.
    pub fn is_refresh(&self) -> bool {
        self.route().trim_end_matches('/').ends_with(REFRESH_PATH)
    }

    /// Whether this request is already a post-refresh replay.
    pub fn is_retried(&self) -> bool {
        self.headers
            .get(RETRIED_HEADER)
            .is_some_and(|value| value.as_bytes() == b"1")
    }

    /// The replay of this request, carrying the retried marker.
    pub fn into_retry(mut self) -> Self {
        self.headers.insert(
            HeaderName::from_static(RETRIED_HEADER),
            HeaderValue::from_static("1"),
        );
        self
    }
}

/// A completed HTTP exchange as seen by the gateway.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
