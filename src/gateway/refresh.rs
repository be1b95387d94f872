//! Single-flight session refresh.
//!
//! The first caller that finds no refresh in progress spawns the refresh task
//! and installs a shared handle to it in the slot while holding the lock;
//! every later caller clones that handle instead of issuing another network
//! call. The task runs to completion even when every waiter is cancelled, and
//! clears the slot itself once the refresh call settles, before any waiter
//! observes the outcome, so the next 401 after that starts a fresh refresh.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::StatusCode;
use reqwest::header::{CACHE_CONTROL, HeaderValue};

use super::events::UnauthorizedBus;
use super::request::{ApiRequest, REFRESH_PATH};
use super::transport::{Transport, TransportError};
use crate::sync::LockExt;

/// Upper bound on one refresh call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a refresh wave failed. Cloned to every waiter of that wave.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh rejected with status {0}")]
    Rejected(StatusCode),
    #[error("refresh call failed: {0}")]
    Transport(String),
    #[error("refresh call did not settle within {0:?}")]
    TimedOut(Duration),
}

pub type RefreshOutcome = Result<(), RefreshError>;

type RefreshFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    bus: UnauthorizedBus,
    timeout: Duration,
    in_flight: Arc<Mutex<Option<RefreshFlight>>>,
}

impl RefreshCoordinator {
    pub fn new(transport: Arc<dyn Transport>, bus: UnauthorizedBus) -> Self {
        Self::with_timeout(transport, bus, DEFAULT_REFRESH_TIMEOUT)
    }

    pub fn with_timeout(
        transport: Arc<dyn Transport>,
        bus: UnauthorizedBus,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            bus,
            timeout,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a refresh, or join the one already running, and wait for its outcome.
    pub async fn ensure_fresh_session(&self) -> RefreshOutcome {
        let flight = {
            let mut slot = self.in_flight.lock_or_recover();
            match slot.as_ref() {
                Some(flight) => {
                    tracing::debug!("Joining in-flight session refresh");
                    flight.clone()
                }
                None => {
                    let flight = self.start_flight();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };
        flight.await
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.lock_or_recover().is_some()
    }

    fn start_flight(&self) -> RefreshFlight {
        let transport = Arc::clone(&self.transport);
        let bus = self.bus.clone();
        let slot = Arc::clone(&self.in_flight);
        let aborted_slot = Arc::clone(&self.in_flight);
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            let outcome = refresh_once(transport.as_ref(), timeout).await;
            slot.lock_or_recover().take();

            match &outcome {
                Ok(()) => tracing::info!("Session refreshed"),
                Err(e) => {
                    tracing::warn!(error = %e, "Session refresh failed");
                    bus.emit_unauthorized();
                }
            }
            outcome
        });

        async move {
            task.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Session refresh task failed");
                aborted_slot.lock_or_recover().take();
                Err(RefreshError::Transport(e.to_string()))
            })
        }
        .boxed()
        .shared()
    }
}

/// Issue the refresh call directly on the transport, bypassing the interceptor.
async fn refresh_once(transport: &dyn Transport, timeout: Duration) -> RefreshOutcome {
    let request =
        ApiRequest::post(REFRESH_PATH).header(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    match tokio::time::timeout(timeout, transport.send(&request)).await {
        Err(_) => Err(RefreshError::TimedOut(timeout)),
        Ok(Err(TransportError::TimedOut)) => Err(RefreshError::TimedOut(timeout)),
        Ok(Err(e)) => Err(RefreshError::Transport(e.to_string())),
        Ok(Ok(response)) if response.is_success() => Ok(()),
        Ok(Ok(response)) => Err(RefreshError::Rejected(response.status)),
    }
}
