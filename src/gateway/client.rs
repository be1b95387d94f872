//! Typed JSON calls on top of the auth gateway.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::cache::QueryCache;
use super::error::{ApiError, ClientError};
use super::interceptor::AuthGateway;
use super::query::ListQuery;
use super::request::{
    ApiRequest, ApiResponse, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, REGISTER_PATH,
};

/// Credentials for `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    gateway: Arc<AuthGateway>,
    cache: Arc<QueryCache>,
}

impl ApiClient {
    pub fn new(gateway: Arc<AuthGateway>, cache: Arc<QueryCache>) -> Self {
        Self { gateway, cache }
    }

    pub fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Send through the gateway and decode a successful body into `T`.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let value = self.execute_value(request).await?;
        serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn execute_value(&self, request: ApiRequest) -> Result<Value, ClientError> {
        let response = self.gateway.send(request).await?;
        decode_response(&response)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(ApiRequest::get(path)).await
    }

    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &ListQuery,
    ) -> Result<T, ClientError> {
        self.execute(ApiRequest::get(query.apply_to(path))).await
    }

    /// GET through the session cache.
    pub async fn get_cached<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let value = match self.cache.get(path) {
            Some(value) => value,
            None => {
                let value = self.execute_value(ApiRequest::get(path)).await?;
                self.cache.insert(path, value.clone());
                value
            }
        };
        serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(json_request(ApiRequest::post(path), body)?).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(json_request(ApiRequest::put(path), body)?).await
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(json_request(ApiRequest::patch(path), body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.execute_value(ApiRequest::delete(path)).await.map(drop)
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<Value, ClientError> {
        self.post_json(LOGIN_PATH, credentials).await
    }

    pub async fn register(&self, payload: &RegisterRequest) -> Result<Value, ClientError> {
        self.post_json(REGISTER_PATH, payload).await
    }

    /// Ends the session remotely and drops everything cached for it.
    pub async fn logout(&self) -> Result<Value, ClientError> {
        let result = self.execute_value(ApiRequest::post(LOGOUT_PATH)).await;
        self.cache.clear();
        result
    }

    /// Explicit refresh; normally the gateway refreshes on its own.
    pub async fn refresh(&self) -> Result<Value, ClientError> {
        self.execute_value(ApiRequest::post(REFRESH_PATH)).await
    }
}

fn json_request<B: Serialize + ?Sized>(
    request: ApiRequest,
    body: &B,
) -> Result<ApiRequest, ClientError> {
    request
        .json(body)
        .map_err(|e| ClientError::Encode(e.to_string()))
}

/// Map a final response onto the caller-facing result.
///
/// An empty success body decodes as `null`. A result envelope
/// (`{ isSuccess, value }`) is unwrapped to its `value`.
fn decode_response(response: &ApiResponse) -> Result<Value, ClientError> {
    if response.is_unauthorized() {
        return Err(ClientError::Unauthorized(ApiError::from_response(response)));
    }
    if !response.is_success() {
        return Err(ClientError::Api(ApiError::from_response(response)));
    }
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    let value: Value =
        serde_json::from_slice(&response.body).map_err(|e| ClientError::Decode(e.to_string()))?;

    match value {
        Value::Object(map) if map.contains_key("isSuccess") => {
            if map.get("isSuccess").and_then(Value::as_bool) == Some(true) {
                Ok(map.get("value").cloned().unwrap_or(Value::Null))
            } else {
                Err(ClientError::Api(ApiError::from_result_envelope(
                    response.status,
                    &map,
                )))
            }
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_decode_empty_success_is_null() {
        let response = ApiResponse::new(StatusCode::NO_CONTENT, "");
        assert_eq!(decode_response(&response).unwrap(), Value::Null);
    }

    #[test]
    fn test_decode_unwraps_result_envelope() {
        let response = ApiResponse::new(
            StatusCode::OK,
            r#"{"isSuccess":true,"value":{"id":"l-1"}}"#,
        );
        assert_eq!(decode_response(&response).unwrap()["id"], "l-1");
    }

    #[test]
    fn test_decode_failed_result_envelope() {
        let response = ApiResponse::new(
            StatusCode::OK,
            r#"{"isSuccess":false,"error":{"code":"Tenancy.Overlap","message":"Dates overlap"}}"#,
        );
        match decode_response(&response) {
            Err(ClientError::Api(e)) => assert_eq!(e.message, "Dates overlap"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_unauthorized_is_terminal() {
        let response = ApiResponse::new(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(
            decode_response(&response),
            Err(ClientError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_decode_error_status() {
        let response = ApiResponse::new(StatusCode::NOT_FOUND, r#"{"title":"Property not found"}"#);
        let err = decode_response(&response).unwrap_err();
        let api = err.api_error().unwrap();
        assert_eq!(api.message, "Property not found");
        assert_eq!(api.status, StatusCode::NOT_FOUND);
    }
}
