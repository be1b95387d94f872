//! Refresh-and-retry on 401.

use std::sync::Arc;
use std::time::Duration;

use super::events::UnauthorizedBus;
use super::refresh::RefreshCoordinator;
use super::request::{ApiRequest, ApiResponse};
use super::transport::{Transport, TransportError};

/// Wraps every API call so an expired session is recovered transparently.
///
/// A request is refreshed-and-replayed at most once; a 401 on the replay, or
/// a failed refresh, is handed back to the caller unchanged.
pub struct AuthGateway {
    transport: Arc<dyn Transport>,
    coordinator: RefreshCoordinator,
    bus: UnauthorizedBus,
}

impl AuthGateway {
    pub fn new(transport: Arc<dyn Transport>, bus: UnauthorizedBus) -> Self {
        let coordinator = RefreshCoordinator::new(Arc::clone(&transport), bus.clone());
        Self {
            transport,
            coordinator,
            bus,
        }
    }

    pub fn with_refresh_timeout(
        transport: Arc<dyn Transport>,
        bus: UnauthorizedBus,
        refresh_timeout: Duration,
    ) -> Self {
        let coordinator =
            RefreshCoordinator::with_timeout(Arc::clone(&transport), bus.clone(), refresh_timeout);
        Self {
            transport,
            coordinator,
            bus,
        }
    }

    pub fn bus(&self) -> &UnauthorizedBus {
        &self.bus
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let response = self.transport.send(&request).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        if request.is_refresh() {
            return Ok(response);
        }

        if request.is_retried() {
            tracing::debug!(path = %request.route(), "401 after replay, giving up");
            self.bus.emit_unauthorized();
            return Ok(response);
        }

        match self.coordinator.ensure_fresh_session().await {
            Ok(()) => {
                tracing::debug!(
                    method = %request.method,
                    path = %request.route(),
                    "Replaying request after refresh"
                );
                let replayed = self.transport.send(&request.into_retry()).await?;
                if replayed.is_unauthorized() {
                    self.bus.emit_unauthorized();
                }
                Ok(replayed)
            }
            Err(e) => {
                tracing::debug!(path = %request.route(), error = %e, "Refresh failed, surfacing 401");
                Ok(response)
            }
        }
    }
}
