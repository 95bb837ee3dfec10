//! HTTP status classification and error-payload parsing
//!
//! Turns a non-200 response into the matching [`Error`] variant. The routing
//! service reports failures as `{"error": {"code": ..., "message": ...}}`,
//! sometimes as `{"error": "<text>"}`; anything else falls back to the raw
//! body.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::Error;

/// Classification of a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClassification {
    /// 200, the only status treated as success
    Success,
    /// 429, retried with backoff
    RateLimitError,
    /// 403, key rejected
    AuthenticationError,
    /// Remaining 4xx
    ClientError,
    /// 5xx and anything unrecognized
    ServerError,
}

impl ErrorClassification {
    /// Classify an HTTP status code
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            200 => ErrorClassification::Success,
            429 => ErrorClassification::RateLimitError,
            403 => ErrorClassification::AuthenticationError,
            400..=499 => ErrorClassification::ClientError,
            _ => ErrorClassification::ServerError,
        }
    }

    /// Check if this classification is retried by the client
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClassification::RateLimitError)
    }
}

/// Build the error for a non-200 response
pub fn error_for_status(status: StatusCode, body: &str) -> Error {
    let details = serde_json::from_str::<Value>(body).ok();
    let (code, message) = extract_provider_error(&details, body);

    match ErrorClassification::from_status(status) {
        ErrorClassification::RateLimitError => Error::OverQueryLimit { message },
        ErrorClassification::AuthenticationError => Error::InvalidKey { message },
        ErrorClassification::ClientError => Error::Api {
            status: status.as_u16(),
            code,
            message,
            details,
        },
        ErrorClassification::ServerError | ErrorClassification::Success => Error::GenericServer {
            status: status.as_u16(),
            message,
        },
    }
}

/// Extract provider-specific error code and message
fn extract_provider_error(details: &Option<Value>, body: &str) -> (Option<String>, String) {
    if let Some(json) = details {
        match json.get("error") {
            Some(Value::Object(error)) => {
                let code = error.get("code").and_then(scalar_to_string);
                let message = error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or(body)
                    .to_string();
                return (code, message);
            }
            Some(Value::String(message)) => return (None, message.clone()),
            _ => {}
        }

        if let Some(message) = json.get("message").and_then(|m| m.as_str()) {
            return (None, message.to_string());
        }
    }

    (None, body.to_string())
}

/// Codes arrive as strings or as numbers (e.g. `2003`)
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
