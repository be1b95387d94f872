pub mod cli;
pub mod gateway;
pub mod pages;
pub mod proxy;
pub mod rate_limit;
pub mod session;
mod sync;

use axum::Router;
use pages::PagesState;
use proxy::{ProxyState, Upstream};
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

pub struct ServerConfig {
    /// Base URL of the remote REST API that issues session cookies
    pub api_base_url: Url,
    /// Timeout for each forwarded auth call
    pub upstream_timeout: Duration,
    /// Whether to rate-limit by X-Forwarded-For (requires a trusted proxy)
    pub trust_forwarded_for: bool,
    /// Dashboard shell page title
    pub title: String,
    /// Dashboard bundle script URL
    pub bundle_url: Option<String>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Result<Router, reqwest::Error> {
    let upstream = Arc::new(Upstream::new(
        config.api_base_url.clone(),
        config.upstream_timeout,
    )?);
    let rate_limits = Arc::new(RateLimitConfig::new(config.trust_forwarded_for));

    let auth_routes = proxy::router(ProxyState { upstream }, rate_limits);
    let page_routes = pages::router(PagesState::new(
        &config.title,
        config.bundle_url.as_deref(),
    ));

    Ok(Router::new()
        .nest("/api/auth", auth_routes)
        .merge(page_routes))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config).map_err(std::io::Error::other)?;
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
