//! Session cookie presence checks.
//!
//! Cookie values are issued by the remote API and never inspected here.

use axum::http::{HeaderMap, header};

/// Access credential cookie (short-lived).
pub const ACCESS_COOKIE_NAME: &str = "ACCESS_TOKEN";

/// Refresh credential cookie (long-lived).
pub const REFRESH_COOKIE_NAME: &str = "REFRESH_TOKEN";

/// Extract a cookie value from the Cookie header(s).
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookie_header| cookie_header.split(';'))
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}

fn has_cookie(headers: &HeaderMap, name: &str) -> bool {
    get_cookie(headers, name).is_some_and(|value| !value.is_empty())
}

/// Which session credentials the browser presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionCookies {
    pub has_access: bool,
    pub has_refresh: bool,
}

impl SessionCookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            has_access: has_cookie(headers, ACCESS_COOKIE_NAME),
            has_refresh: has_cookie(headers, REFRESH_COOKIE_NAME),
        }
    }

    /// Signed in, or able to become signed in on the next API call.
    pub fn is_authed_or_refreshable(&self) -> bool {
        self.has_access || self.has_refresh
    }
}
