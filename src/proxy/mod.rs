//! Cookie-forwarding auth routes.
//!
//! - POST `/login` - Forward credentials, no cookies; mirror body and `Set-Cookie`
//! - POST `/register` - Same contract as login
//! - POST `/logout` - Forward cookies; mirror status and `Set-Cookie`, no body
//! - POST `/refresh` - Forward cookies; mirror body and `Set-Cookie`
//!
//! Credentials are never read or rewritten, only passed along.

mod error;
mod upstream;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    middleware,
    response::Response,
    routing::post,
};
use std::sync::Arc;

use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_register};

pub use error::{ProxyError, ResultExt};
pub use upstream::{AuthEndpoint, Upstream, UpstreamReply};

#[derive(Clone)]
pub struct ProxyState {
    pub upstream: Arc<Upstream>,
}

pub fn router(state: ProxyState, rate_limits: Arc<RateLimitConfig>) -> Router {
    let login = Router::new().route("/login", post(login)).layer(
        middleware::from_fn_with_state(rate_limits.clone(), rate_limit_login),
    );
    let register = Router::new().route("/register", post(register)).layer(
        middleware::from_fn_with_state(rate_limits, rate_limit_register),
    );

    Router::new()
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .merge(login)
        .merge(register)
        .with_state(state)
}

async fn login(State(state): State<ProxyState>, body: Bytes) -> Result<Response, ProxyError> {
    let reply = state
        .upstream
        .forward(AuthEndpoint::Login, Some(body), None)
        .await?;
    Ok(reply.into_json_response())
}

async fn register(State(state): State<ProxyState>, body: Bytes) -> Result<Response, ProxyError> {
    let reply = state
        .upstream
        .forward(AuthEndpoint::Register, Some(body), None)
        .await?;
    Ok(reply.into_json_response())
}

async fn logout(
    State(state): State<ProxyState>,
    headers: HeaderMap,
) -> Result<Response, ProxyError> {
    let reply = state
        .upstream
        .forward(AuthEndpoint::Logout, None, Some(&headers))
        .await?;
    Ok(reply.into_empty_response())
}

async fn refresh(
    State(state): State<ProxyState>,
    headers: HeaderMap,
) -> Result<Response, ProxyError> {
    let reply = state
        .upstream
        .forward(AuthEndpoint::Refresh, None, Some(&headers))
        .await?;
    Ok(reply.into_json_response())
}
