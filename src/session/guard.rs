//! Page route guard keyed on session cookie presence.
//!
//! Only presence is checked: a visitor holding just a refresh cookie is let
//! through, and the client gateway refreshes on its first API call.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::cookie::SessionCookies;
use crate::gateway::login_redirect_target;

pub const LOGIN_PAGE: &str = "/login";
pub const APP_HOME: &str = "/app";

/// Pages a signed-in visitor is bounced away from.
const AUTH_PAGES: &[&str] = &["/", LOGIN_PAGE];

/// Prefixes that require a session.
const PROTECTED: &[&str] = &[APP_HOME];

/// Never guarded.
const PASSTHROUGH_PREFIXES: &[&str] = &["/api/auth", "/assets"];

fn is_passthrough(path: &str) -> bool {
    path == "/favicon.ico" || PASSTHROUGH_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// What the guard decides for one request.
#[derive(Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

pub fn decide(path: &str, query: Option<&str>, cookies: SessionCookies) -> GuardDecision {
    if is_passthrough(path) {
        return GuardDecision::Allow;
    }

    let authed = cookies.is_authed_or_refreshable();

    if AUTH_PAGES.contains(&path) && authed {
        return GuardDecision::Redirect(APP_HOME.to_string());
    }

    if !PROTECTED.iter().any(|p| path.starts_with(p)) {
        if path == "/" && !authed {
            return GuardDecision::Redirect(LOGIN_PAGE.to_string());
        }
        return GuardDecision::Allow;
    }

    if authed {
        return GuardDecision::Allow;
    }

    let return_to = match query {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path.to_string(),
    };
    GuardDecision::Redirect(login_redirect_target(LOGIN_PAGE, &return_to))
}

/// Axum middleware applying [`decide`] to page requests.
pub async fn guard_pages(request: Request, next: Next) -> Response {
    let cookies = SessionCookies::from_headers(request.headers());
    let decision = decide(request.uri().path(), request.uri().query(), cookies);
    match decision {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::Redirect(target) => {
            tracing::debug!(path = %request.uri().path(), target = %target, "Route guard redirect");
            Redirect::temporary(&target).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: SessionCookies = SessionCookies {
        has_access: false,
        has_refresh: false,
    };
    const ACCESS: SessionCookies = SessionCookies {
        has_access: true,
        has_refresh: false,
    };
    const REFRESH_ONLY: SessionCookies = SessionCookies {
        has_access: false,
        has_refresh: true,
    };

    #[test]
    fn test_passthrough_paths() {
        assert_eq!(decide("/api/auth/refresh", None, NONE), GuardDecision::Allow);
        assert_eq!(decide("/assets/app.js", None, NONE), GuardDecision::Allow);
        assert_eq!(decide("/favicon.ico", None, NONE), GuardDecision::Allow);
    }

    #[test]
    fn test_signed_in_visitor_skips_login() {
        assert_eq!(
            decide("/login", None, ACCESS),
            GuardDecision::Redirect("/app".into())
        );
        assert_eq!(
            decide("/", None, REFRESH_ONLY),
            GuardDecision::Redirect("/app".into())
        );
    }

    #[test]
    fn test_root_without_session_goes_to_login() {
        assert_eq!(decide("/", None, NONE), GuardDecision::Redirect("/login".into()));
        assert_eq!(decide("/login", None, NONE), GuardDecision::Allow);
    }

    #[test]
    fn test_protected_with_refresh_only_is_allowed() {
        assert_eq!(decide("/app/landlords", None, REFRESH_ONLY), GuardDecision::Allow);
        assert_eq!(decide("/app/landlords", None, ACCESS), GuardDecision::Allow);
    }

    #[test]
    fn test_protected_without_session_keeps_return_to() {
        assert_eq!(
            decide("/app/properties", Some("page=2"), NONE),
            GuardDecision::Redirect("/login?returnTo=%2Fapp%2Fproperties%3Fpage%3D2".into())
        );
    }

    #[test]
    fn test_unprotected_pages_pass() {
        assert_eq!(decide("/about", None, NONE), GuardDecision::Allow);
    }
}
