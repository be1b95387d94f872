//! HTTP client for the remote API's auth endpoints.

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use url::Url;

use super::error::{ProxyError, ResultExt};

/// Remote auth endpoints the shim forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEndpoint {
    Login,
    Register,
    Logout,
    Refresh,
}

impl AuthEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/api/auth/login",
            Self::Register => "/api/auth/register",
            Self::Logout => "/api/auth/logout",
            Self::Refresh => "/api/auth/refresh",
        }
    }
}

/// Reply from the remote API, reduced to what gets mirrored.
#[derive(Debug)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub set_cookies: Vec<HeaderValue>,
    pub body: Bytes,
}

impl UpstreamReply {
    /// Mirror status and every `Set-Cookie`, with the body as JSON.
    pub fn into_json_response(self) -> Response {
        let body = if self.body.is_empty() {
            Body::empty()
        } else {
            Body::from(self.body.clone())
        };
        let mut response = self.response_with(body);
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }

    /// Mirror status and every `Set-Cookie`, without a body.
    pub fn into_empty_response(self) -> Response {
        self.response_with(Body::empty())
    }

    fn response_with(self, body: Body) -> Response {
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        for cookie in self.set_cookies {
            headers.append(header::SET_COOKIE, cookie);
        }
        response
    }
}

/// Cookie-less client: credentials only travel as explicitly forwarded headers.
pub struct Upstream {
    client: reqwest::Client,
    base_url: Url,
}

impl Upstream {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// POST to `endpoint`, forwarding `body` and the inbound `Cookie` header(s).
    pub async fn forward(
        &self,
        endpoint: AuthEndpoint,
        body: Option<Bytes>,
        inbound: Option<&HeaderMap>,
    ) -> Result<UpstreamReply, ProxyError> {
        let url = self
            .base_url
            .join(endpoint.path())
            .map_err(|_| ProxyError::bad_request("Invalid upstream url"))?;

        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        }
        if let Some(cookie) = inbound.and_then(cookie_header) {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await.upstream_err(endpoint.path())?;
        let status = response.status();
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .cloned()
            .collect();
        let body = response.bytes().await.upstream_err(endpoint.path())?;

        tracing::debug!(
            endpoint = endpoint.path(),
            status = status.as_u16(),
            "Forwarded auth call"
        );

        Ok(UpstreamReply {
            status,
            set_cookies,
            body,
        })
    }
}

/// All inbound Cookie header lines joined into one.
fn cookie_header(headers: &HeaderMap) -> Option<HeaderValue> {
    let parts: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .collect();
    if parts.is_empty() {
        return None;
    }
    HeaderValue::from_str(&parts.join("; ")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header_joins_lines() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("ACCESS_TOKEN=a"));
        headers.append(header::COOKIE, HeaderValue::from_static("REFRESH_TOKEN=r"));

        assert_eq!(
            cookie_header(&headers).unwrap(),
            "ACCESS_TOKEN=a; REFRESH_TOKEN=r"
        );
        assert!(cookie_header(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_reply_mirrors_every_set_cookie() {
        let reply = UpstreamReply {
            status: StatusCode::CREATED,
            set_cookies: vec![
                HeaderValue::from_static("ACCESS_TOKEN=a; HttpOnly; Path=/"),
                HeaderValue::from_static("REFRESH_TOKEN=r; HttpOnly; Path=/api/auth"),
            ],
            body: Bytes::from_static(b"{\"ok\":true}"),
        };

        let response = reply.into_json_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[1], "REFRESH_TOKEN=r; HttpOnly; Path=/api/auth");
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
