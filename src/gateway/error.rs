//! Normalized API errors.
//!
//! The remote API reports failures in several envelope shapes. They are
//! parsed into [`ErrorEnvelope`] variants and reduced to one message in a
//! fixed priority order:
//!
//! 1. problem-details `title`
//! 2. problem-details `detail`
//! 3. first message of the `errors` field map
//! 4. first element of a string-array body
//! 5. plain-text body
//! 6. the status reason phrase
//! 7. `"Request failed"`

use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use serde_json::{Map, Value};

use super::request::ApiResponse;
use super::transport::TransportError;

pub const FALLBACK_MESSAGE: &str = "Request failed";

/// An HTTP error response reduced to something a form or toast can show.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub message: String,
    pub status: StatusCode,
    /// Raw body, parsed as JSON when possible, else a JSON string.
    pub payload: Value,
    /// Field name (first letter lowercased) to its first message.
    pub field_errors: BTreeMap<String, String>,
    top_level: Option<String>,
}

impl ApiError {
    pub fn from_response(response: &ApiResponse) -> Self {
        let payload = parse_payload(&response.body);
        Self::from_payload(response.status, payload)
    }

    pub fn from_payload(status: StatusCode, payload: Value) -> Self {
        let envelope = ErrorEnvelope::parse(&payload);
        let message = envelope
            .message()
            .map(str::to_string)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
        let field_errors = field_errors(&payload);
        let top_level = envelope.form_message().map(str::to_string);

        Self {
            message,
            status,
            payload,
            field_errors,
            top_level,
        }
    }

    /// Failure reported inside a 2xx result envelope (`isSuccess: false`).
    pub(crate) fn from_result_envelope(status: StatusCode, envelope: &Map<String, Value>) -> Self {
        let error = envelope.get("error");
        let from_message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let from_details = error
            .and_then(|e| e.get("details"))
            .and_then(Value::as_array)
            .map(|details| join_field(details, "value"))
            .filter(|s| !s.is_empty());
        let from_errors = envelope
            .get("errors")
            .and_then(Value::as_array)
            .map(|errors| join_field(errors, "message"))
            .filter(|s| !s.is_empty());

        let message = from_message
            .or(from_details)
            .or(from_errors)
            .unwrap_or_else(|| "Request failed.".to_string());

        Self {
            top_level: Some(message.clone()),
            message,
            status,
            payload: Value::Object(envelope.clone()),
            field_errors: BTreeMap::new(),
        }
    }

    /// Message to show above a form: `None` when the error maps onto fields.
    pub fn form_message(&self) -> Option<&str> {
        if !self.field_errors.is_empty() {
            return None;
        }
        Some(self.top_level.as_deref().unwrap_or(&self.message))
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status.as_u16())
    }
}

impl std::error::Error for ApiError {}

/// Everything an [`ApiClient`](super::ApiClient) call can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// 401 that refresh could not recover.
    #[error("session expired: {0}")]
    Unauthorized(ApiError),
    #[error(transparent)]
    Api(ApiError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to encode request body: {0}")]
    Encode(String),
    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Unauthorized(e) | Self::Api(e) => Some(e),
            _ => None,
        }
    }
}

/// Known error body shapes.
#[derive(Debug, PartialEq)]
enum ErrorEnvelope<'a> {
    Problem {
        title: Option<&'a str>,
        detail: Option<&'a str>,
        message: Option<&'a str>,
        first_field_error: Option<&'a str>,
    },
    Messages(Vec<&'a str>),
    Text(&'a str),
    Unrecognized,
}

impl<'a> ErrorEnvelope<'a> {
    fn parse(payload: &'a Value) -> Self {
        match payload {
            Value::Object(map) => Self::Problem {
                title: non_empty_str(map.get("title")),
                detail: non_empty_str(map.get("detail")),
                message: non_empty_str(map.get("message")),
                first_field_error: map
                    .get("errors")
                    .and_then(Value::as_object)
                    .and_then(|errors| errors.values().find_map(first_message)),
            },
            Value::Array(items) => {
                let messages: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                if messages.is_empty() {
                    Self::Unrecognized
                } else {
                    Self::Messages(messages)
                }
            }
            Value::String(text) if !text.trim().is_empty() => Self::Text(text),
            _ => Self::Unrecognized,
        }
    }

    fn message(&self) -> Option<&'a str> {
        match self {
            Self::Problem {
                title,
                detail,
                first_field_error,
                ..
            } => (*title).or(*detail).or(*first_field_error),
            Self::Messages(messages) => messages.first().copied(),
            Self::Text(text) => Some(*text),
            Self::Unrecognized => None,
        }
    }

    fn form_message(&self) -> Option<&'a str> {
        match self {
            Self::Problem { title, message, .. } => (*title).or(*message),
            _ => None,
        }
    }
}

fn parse_payload(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn first_message(messages: &Value) -> Option<&str> {
    match messages {
        Value::Array(items) => items.first().and_then(Value::as_str),
        Value::String(s) => Some(s.as_str()),
        _ => None,
    }
}

/// Field errors from `errors`, or the nested `extensions.errors` bag.
fn field_errors(payload: &Value) -> BTreeMap<String, String> {
    let bag = payload
        .get("errors")
        .or_else(|| payload.get("extensions").and_then(|e| e.get("errors")))
        .or_else(|| payload.get("Extensions").and_then(|e| e.get("errors")))
        .and_then(Value::as_object);

    let Some(bag) = bag else {
        return BTreeMap::new();
    };

    bag.iter()
        .map(|(key, messages)| {
            let message = match messages {
                Value::String(s) => s.clone(),
                other => first_message(other)
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            };
            (lower_first(key), message)
        })
        .collect()
}

fn lower_first(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn join_field(items: &[Value], field: &str) -> String {
    items
        .iter()
        .filter_map(|item| item.get(field).and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn error_for(body: &str) -> ApiError {
        ApiError::from_response(&ApiResponse::new(StatusCode::BAD_REQUEST, body.to_string()))
    }

    #[test]
    fn test_title_wins_over_detail_and_errors() {
        let e = error_for(
            r#"{"title":"Validation failed","detail":"See errors","errors":{"Email":["Email is taken"]}}"#,
        );
        assert_eq!(e.message, "Validation failed");
    }

    #[test]
    fn test_detail_when_no_title() {
        let e = error_for(r#"{"detail":"Landlord not found","status":404}"#);
        assert_eq!(e.message, "Landlord not found");
    }

    #[test]
    fn test_first_field_error_when_no_title_or_detail() {
        let e = error_for(r#"{"errors":{"Email":["Email is taken","Too long"]}}"#);
        assert_eq!(e.message, "Email is taken");
    }

    #[test]
    fn test_string_array_body() {
        let e = error_for(r#"["Password too short","Password needs a digit"]"#);
        assert_eq!(e.message, "Password too short");
    }

    #[test]
    fn test_plain_text_body() {
        let e = error_for("upstream exploded");
        assert_eq!(e.message, "upstream exploded");
        assert_eq!(e.payload, json!("upstream exploded"));
    }

    #[test]
    fn test_empty_body_falls_back_to_reason() {
        let e = ApiError::from_response(&ApiResponse::new(StatusCode::CONFLICT, ""));
        assert_eq!(e.message, "Conflict");
        assert_eq!(e.payload, Value::Null);
    }

    #[test]
    fn test_unknown_status_falls_back_to_generic() {
        let status = StatusCode::from_u16(599).unwrap();
        let e = ApiError::from_payload(status, json!({ "unexpected": true }));
        assert_eq!(e.message, FALLBACK_MESSAGE);
    }

    #[test]
    fn test_empty_title_is_skipped() {
        let e = error_for(r#"{"title":"","detail":"Real reason"}"#);
        assert_eq!(e.message, "Real reason");
    }

    #[test]
    fn test_field_errors_lowercase_first_letter() {
        let e = error_for(r#"{"errors":{"Email":["Email is taken"],"FirstName":"Required"}}"#);
        assert_eq!(e.field_errors.get("email").unwrap(), "Email is taken");
        assert_eq!(e.field_errors.get("firstName").unwrap(), "Required");
        assert_eq!(e.form_message(), None);
    }

    #[test]
    fn test_field_errors_from_nested_extensions() {
        let e = error_for(r#"{"title":"Invalid","Extensions":{"errors":{"Postcode":["Bad postcode"]}}}"#);
        assert_eq!(e.field_errors.get("postcode").unwrap(), "Bad postcode");
        assert_eq!(e.message, "Invalid");
    }

    #[test]
    fn test_form_message_prefers_title_then_message() {
        let e = error_for(r#"{"message":"Tenancy already started"}"#);
        assert_eq!(e.form_message(), Some("Tenancy already started"));

        let e = error_for(r#"{"title":"Forbidden","message":"No access"}"#);
        assert_eq!(e.form_message(), Some("Forbidden"));

        let e = error_for("plain");
        assert_eq!(e.form_message(), Some("plain"));
    }

    #[test]
    fn test_result_envelope_message_priority() {
        let envelope = json!({
            "isSuccess": false,
            "error": { "code": "X", "message": "", "details": [{ "key": "a", "value": "one" }, { "value": "two" }] }
        });
        let e = ApiError::from_result_envelope(StatusCode::OK, envelope.as_object().unwrap());
        assert_eq!(e.message, "one; two");

        let envelope = json!({ "isSuccess": false, "errors": [{ "message": "bad rent" }] });
        let e = ApiError::from_result_envelope(StatusCode::OK, envelope.as_object().unwrap());
        assert_eq!(e.message, "bad rent");

        let envelope = json!({ "isSuccess": false });
        let e = ApiError::from_result_envelope(StatusCode::OK, envelope.as_object().unwrap());
        assert_eq!(e.message, "Request failed.");
    }

    #[test]
    fn test_envelope_variants() {
        let array = json!(["a", 1, "b"]);
        assert_eq!(ErrorEnvelope::parse(&array), ErrorEnvelope::Messages(vec!["a", "b"]));
        assert_eq!(ErrorEnvelope::parse(&json!([1, 2])), ErrorEnvelope::Unrecognized);
        assert_eq!(ErrorEnvelope::parse(&json!("  ")), ErrorEnvelope::Unrecognized);
        assert_eq!(ErrorEnvelope::parse(&Value::Null), ErrorEnvelope::Unrecognized);
    }
}
