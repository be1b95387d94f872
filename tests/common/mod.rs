#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use letdesk::gateway::{
    ApiRequest, ApiResponse, Location, Navigator, REFRESH_PATH, Transport, TransportError,
};
use reqwest::StatusCode;
use tokio::sync::Semaphore;

pub type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync;

/// Scripted transport: a handler answers every request, calls are recorded
/// per route, and the refresh call can be held until released.
pub struct MockTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<ApiRequest>>,
    refresh_gate: Option<Semaphore>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            refresh_gate: None,
        })
    }

    /// Like [`MockTransport::new`], but the refresh call blocks until
    /// [`MockTransport::release_refresh`] is called.
    pub fn gated<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            refresh_gate: Some(Semaphore::new(0)),
        })
    }

    pub fn release_refresh(&self) {
        if let Some(gate) = &self.refresh_gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn calls_to(&self, route: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.route() == route)
            .count()
    }

    pub fn retried_calls_to(&self, route: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.route() == route && r.is_retried())
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Method and full path (query included) of every call, in order.
    pub fn log(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.calls.lock().unwrap().push(request.clone());
        if request.route() == REFRESH_PATH {
            if let Some(gate) = &self.refresh_gate {
                let _permit = gate.acquire().await.unwrap();
            }
        }
        (self.handler)(request)
    }
}

/// Remote API double whose session is a single flag: data routes answer 401
/// until a refresh succeeds.
pub struct SessionApi {
    pub authed: AtomicBool,
    pub refresh_status: Mutex<StatusCode>,
}

impl SessionApi {
    pub fn expired() -> Arc<Self> {
        Arc::new(Self {
            authed: AtomicBool::new(false),
            refresh_status: Mutex::new(StatusCode::OK),
        })
    }

    pub fn expire(&self) {
        self.authed.store(false, Ordering::SeqCst);
    }

    pub fn reject_refresh(&self, status: StatusCode) {
        *self.refresh_status.lock().unwrap() = status;
    }

    pub fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        if request.route() == REFRESH_PATH {
            let status = *self.refresh_status.lock().unwrap();
            if status.is_success() {
                self.authed.store(true, Ordering::SeqCst);
                return Ok(ApiResponse::new(status, r#"{"refreshed":true}"#));
            }
            return Ok(ApiResponse::new(
                status,
                r#"{"title":"Refresh token expired"}"#,
            ));
        }
        if self.authed.load(Ordering::SeqCst) {
            Ok(ApiResponse::new(
                StatusCode::OK,
                format!(r#"{{"path":"{}"}}"#, request.route()),
            ))
        } else {
            Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, ""))
        }
    }
}

/// Navigator double recording every replace.
pub struct FakeNavigator {
    pub location: Mutex<Location>,
    pub replaced: Mutex<Vec<String>>,
}

impl FakeNavigator {
    pub fn at(path: &str, query: &str) -> Arc<Self> {
        Arc::new(Self {
            location: Mutex::new(Location::new(path, query)),
            replaced: Mutex::new(Vec::new()),
        })
    }

    pub fn replaced(&self) -> Vec<String> {
        self.replaced.lock().unwrap().clone()
    }
}

impl Navigator for FakeNavigator {
    fn location(&self) -> Location {
        self.location.lock().unwrap().clone()
    }

    fn replace(&self, target: &str) {
        self.replaced.lock().unwrap().push(target.to_string());
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        *self.location.lock().unwrap() = Location::new(path, query);
    }
}

/// Serve `app` on an ephemeral localhost port.
pub async fn spawn_upstream(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind upstream");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Records the `Cookie` header each upstream route received.
#[derive(Clone, Default)]
pub struct CookieLog {
    inner: Arc<Mutex<HashMap<String, Vec<Option<String>>>>>,
}

impl CookieLog {
    pub fn record(&self, route: &str, headers: &axum::http::HeaderMap) {
        let cookie = headers
            .get(axum::http::header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.inner
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_default()
            .push(cookie);
    }

    pub fn seen(&self, route: &str) -> Vec<Option<String>> {
        self.inner
            .lock()
            .unwrap()
            .get(route)
            .cloned()
            .unwrap_or_default()
    }
}
