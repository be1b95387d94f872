//! Rate limiting for the credential-accepting auth routes.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing through the login shim.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Bucket shared by clients whose address cannot be determined.
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Clone)]
pub struct RateLimitConfig {
    /// Login: 1 per second sustained, burst of 5.
    pub login: Arc<IpLimiter>,
    /// Registration: 3 per minute.
    pub register: Arc<IpLimiter>,
    /// Take the client address from the first `X-Forwarded-For` hop.
    pub trust_forwarded_for: bool,
}

impl RateLimitConfig {
    pub fn new(trust_forwarded_for: bool) -> Self {
        Self::with_quotas(
            Quota::per_second(NonZeroU32::MIN).allow_burst(nonzero(5)),
            Quota::per_minute(nonzero(3)),
            trust_forwarded_for,
        )
    }

    pub fn with_quotas(login: Quota, register: Quota, trust_forwarded_for: bool) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(login)),
            register: Arc::new(RateLimiter::keyed(register)),
            trust_forwarded_for,
        }
    }

    fn client_key(&self, request: &Request) -> String {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|ip| !ip.is_empty());
            if let Some(ip) = forwarded {
                return ip.to_string();
            }
        }
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}

fn nonzero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

fn too_many(message: &str) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// Middleware for rate limiting the login route.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let key = config.client_key(&request);
    match config.login.check_key(&key) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(client = %key, "Login rate limit exceeded");
            too_many("Too many login attempts. Please wait before trying again.")
        }
    }
}

/// Middleware for rate limiting the registration route.
pub async fn rate_limit_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let key = config.client_key(&request);
    match config.register.check_key(&key) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(client = %key, "Registration rate limit exceeded");
            too_many("Too many signup attempts. Please wait before trying again.")
        }
    }
}
