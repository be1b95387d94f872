//! Authenticated request gateway.
//!
//! Every API call goes through [`AuthGateway`], which recovers an expired
//! session with one shared refresh call and a single replay per request.
//! When recovery fails the [`UnauthorizedBus`] fires and a mounted
//! [`SessionRedirector`] sends the user back to the login entry point.

mod cache;
mod client;
mod error;
mod events;
mod interceptor;
mod query;
mod redirect;
mod refresh;
mod request;
pub mod resources;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use url::Url;

pub use cache::QueryCache;
pub use client::{ApiClient, LoginRequest, RegisterRequest};
pub use error::{ApiError, ClientError, FALLBACK_MESSAGE};
pub use events::{DEFAULT_FRAME, Subscription, UnauthorizedBus};
pub use interceptor::AuthGateway;
pub use query::{FilterRule, ListQuery, PagedList, QueryOptions, SortDir};
pub use redirect::{
    DEFAULT_LOGIN_PATH, Location, Navigator, SessionCache, SessionRedirector,
    login_redirect_target,
};
pub use refresh::{DEFAULT_REFRESH_TIMEOUT, RefreshCoordinator, RefreshError, RefreshOutcome};
pub use request::{
    ApiRequest, ApiResponse, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, REGISTER_PATH, RETRIED_HEADER,
};
pub use transport::{HttpTransport, Transport, TransportError};

/// Settings for one gateway instance.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: Url,
    /// Per-call timeout on the HTTP transport.
    pub request_timeout: Option<Duration>,
    pub refresh_timeout: Duration,
    /// Debounce window of the unauthorized signal.
    pub frame: Duration,
    pub login_path: String,
}

impl GatewayConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: Some(Duration::from_secs(30)),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            frame: DEFAULT_FRAME,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

/// A wired-up client: transport, gateway, bus and cache for one session.
#[derive(Clone)]
pub struct Gateway {
    client: ApiClient,
    bus: UnauthorizedBus,
    login_path: String,
}

impl Gateway {
    /// Build an HTTP-backed gateway.
    pub fn connect(config: &GatewayConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config.base_url.clone(), config.request_timeout)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Build a gateway over any transport.
    pub fn with_transport(transport: Arc<dyn Transport>, config: &GatewayConfig) -> Self {
        let bus = UnauthorizedBus::with_frame(config.frame);
        let gateway = AuthGateway::with_refresh_timeout(transport, bus.clone(), config.refresh_timeout);
        let client = ApiClient::new(Arc::new(gateway), Arc::new(QueryCache::new()));
        Self {
            client,
            bus,
            login_path: config.login_path.clone(),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn bus(&self) -> &UnauthorizedBus {
        &self.bus
    }

    /// Mount a redirector that clears this gateway's cache and navigates to login.
    pub fn mount_redirector(&self, navigator: Arc<dyn Navigator>) -> Subscription {
        let cache: Arc<dyn SessionCache> = self.client.cache().clone();
        let redirector = Arc::new(SessionRedirector::with_login_path(
            navigator,
            cache,
            self.login_path.clone(),
        ));
        redirector.mount(&self.bus)
    }
}
