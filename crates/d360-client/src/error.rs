//! Crate-level error types for the 360dialog client.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alias for `Result<T, D360Error>`.
pub type D360Result<T> = Result<T, D360Error>;

/// Uniform error type used across the client crate.
///
/// Provider business failures on `send_message` are not errors; they come
/// back as a failed [`crate::response::SendResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct D360Error {
    pub code: D360ErrorCode,
    pub message: String,
    /// Underlying cause (last transport failure, provider error detail, ...).
    pub details: Option<String>,
    /// HTTP status code if originated from an API call.
    pub http_status: Option<u16>,
}

impl fmt::Display for D360Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref d) = self.details {
            write!(f, ": {}", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for D360Error {}

/// Categorised error codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum D360ErrorCode {
    // ── Local, never retried ─────────────────────────────
    Configuration,
    Validation,
    UnsupportedMediaType,
    // ── Network ──────────────────────────────────────────
    Transport,
    // ── Provider ─────────────────────────────────────────
    Api,
    // ── Internal ─────────────────────────────────────────
    Serialization,
    Io,
    Internal,
}

impl D360Error {
    fn new(code: D360ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            http_status: None,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::new(D360ErrorCode::Configuration, msg)
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(D360ErrorCode::Validation, msg)
    }

    pub fn unsupported_media_type(mime: &str) -> Self {
        Self::new(
            D360ErrorCode::UnsupportedMediaType,
            format!("Unsupported media type: {}", mime),
        )
    }

    /// Terminal network failure after the retry budget is spent.
    pub fn transport(attempts: u32, cause: impl Into<String>) -> Self {
        Self {
            code: D360ErrorCode::Transport,
            message: format!("Request failed after {} attempt(s)", attempts),
            details: Some(cause.into()),
            http_status: None,
        }
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::new(D360ErrorCode::Serialization, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(D360ErrorCode::Io, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(D360ErrorCode::Internal, msg)
    }

    /// Build from a non-2xx provider response body.
    ///
    /// Understands both `{"errors":[{"code","message"}]}` and the Graph-style
    /// `{"error":{"code","message"}}` envelopes; anything else is kept as a
    /// truncated raw detail.
    pub fn from_api_response(status: u16, body: &str) -> Self {
        let (message, details) = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(v) => {
                let err = if v["errors"][0].is_object() {
                    &v["errors"][0]
                } else {
                    &v["error"]
                };
                let msg = err["message"]
                    .as_str()
                    .or_else(|| err["title"].as_str())
                    .or_else(|| v["meta"]["developer_message"].as_str())
                    .unwrap_or("Unknown API error")
                    .to_string();
                let code = match &err["code"] {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) => n.to_string(),
                    _ => String::new(),
                };
                (msg, format!("code={}", code))
            }
            Err(_) => (
                "Unparseable API error".to_string(),
                body.chars().take(500).collect(),
            ),
        };
        Self {
            code: D360ErrorCode::Api,
            message,
            details: Some(details),
            http_status: Some(status),
        }
    }

    /// True for failures produced before any network I/O.
    pub fn is_local(&self) -> bool {
        matches!(
            self.code,
            D360ErrorCode::Configuration
                | D360ErrorCode::Validation
                | D360ErrorCode::UnsupportedMediaType
        )
    }
}

impl From<serde_json::Error> for D360Error {
    fn from(e: serde_json::Error) -> Self {
        D360Error::serialization(e.to_string())
    }
}

impl From<std::io::Error> for D360Error {
    fn from(e: std::io::Error) -> Self {
        D360Error::io(e.to_string())
    }
}
