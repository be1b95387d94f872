//! Dashboard page routes.
//!
//! The UI bundle is built and hosted separately; these routes serve the HTML
//! shell that loads it, behind the route guard.

use axum::{
    Router,
    extract::State,
    http::header,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use std::sync::Arc;

use crate::session::{APP_HOME, LOGIN_PAGE, guard_pages};

/// Landing page of the protected tree.
pub const APP_OVERVIEW: &str = "/app/overview";

const NO_CACHE: &str = "no-cache";

#[derive(Clone)]
pub struct PagesState {
    shell: Arc<str>,
}

impl PagesState {
    pub fn new(title: &str, bundle_url: Option<&str>) -> Self {
        let title = escape(title);
        let script = bundle_url
            .map(|src| {
                let src = escape(src);
                format!(r#"<script type="module" src="{src}"></script>"#)
            })
            .unwrap_or_default();
        let shell = format!(
            "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
             <title>{title}</title></head><body><div id=\"root\"></div>{script}</body></html>"
        );
        Self {
            shell: Arc::from(shell),
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn router(state: PagesState) -> Router {
    Router::new()
        .route("/", get(shell_handler))
        .route(LOGIN_PAGE, get(shell_handler))
        .route(APP_HOME, get(Redirect::permanent(APP_OVERVIEW)))
        .route(&format!("{APP_HOME}/{{*path}}"), get(shell_handler))
        .with_state(state)
        .layer(middleware::from_fn(guard_pages))
}

async fn shell_handler(State(state): State<PagesState>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, NO_CACHE),
        ],
        state.shell.to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_escapes_title_and_bundle_url() {
        let state = PagesState::new(
            "Lets & Co </title><script>alert(1)</script>",
            Some(r#"/app.js"><script>alert(2)</script>"#),
        );

        assert!(state.shell.contains(
            "<title>Lets &amp; Co &lt;/title&gt;&lt;script&gt;alert(1)&lt;/script&gt;</title>"
        ));
        assert!(state.shell.contains(
            r#"src="/app.js&quot;&gt;&lt;script&gt;alert(2)&lt;/script&gt;""#
        ));
        assert!(!state.shell.contains("<script>alert"));
    }

    #[test]
    fn test_shell_without_bundle_has_no_script() {
        let state = PagesState::new("Back Office", None);
        assert!(state.shell.contains("<title>Back Office</title>"));
        assert!(!state.shell.contains("<script"));
    }
}
