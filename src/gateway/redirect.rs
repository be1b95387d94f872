//! Sends the user to the login entry point when the session is unrecoverable.

use std::sync::Arc;

use url::form_urlencoded;

use super::events::{Subscription, UnauthorizedBus};

pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Where the user currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    /// Query string without the leading `?`.
    pub query: String,
}

impl Location {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }

    /// `path[?query]`, or `/` when no path is known.
    pub fn return_to(&self) -> String {
        if self.path.is_empty() {
            return "/".to_string();
        }
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }
}

/// Client-side navigation.
pub trait Navigator: Send + Sync {
    fn location(&self) -> Location;
    /// Replace the current history entry with `target`.
    fn replace(&self, target: &str);
}

/// Application data tied to the current session.
pub trait SessionCache: Send + Sync {
    fn clear(&self);
}

/// `login_path?returnTo=<encoded return_to>`.
pub fn login_redirect_target(login_path: &str, return_to: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("returnTo", return_to)
        .finish();
    format!("{login_path}?{query}")
}

pub struct SessionRedirector {
    navigator: Arc<dyn Navigator>,
    cache: Arc<dyn SessionCache>,
    login_path: String,
}

impl SessionRedirector {
    pub fn new(navigator: Arc<dyn Navigator>, cache: Arc<dyn SessionCache>) -> Self {
        Self::with_login_path(navigator, cache, DEFAULT_LOGIN_PATH)
    }

    pub fn with_login_path(
        navigator: Arc<dyn Navigator>,
        cache: Arc<dyn SessionCache>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            navigator,
            cache,
            login_path: login_path.into(),
        }
    }

    /// Start listening. Dropping the returned handle tears the redirector down.
    pub fn mount(self: Arc<Self>, bus: &UnauthorizedBus) -> Subscription {
        bus.on_unauthorized(move || {
            self.handle_unauthorized();
        })
    }

    /// React to one unauthorized signal. Returns the navigation target, or
    /// `None` when already on the login entry point.
    pub fn handle_unauthorized(&self) -> Option<String> {
        let location = self.navigator.location();
        if location.path.starts_with(&self.login_path) {
            tracing::debug!(path = %location.path, "Already on login, not redirecting");
            return None;
        }

        self.cache.clear();
        let target = login_redirect_target(&self.login_path, &location.return_to());
        tracing::info!(target = %target, "Session expired, redirecting to login");
        self.navigator.replace(&target);
        Some(target)
    }
}
