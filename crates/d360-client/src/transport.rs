//! HTTP transport seam.
//!
//! The client never talks to `reqwest` directly: every call is described as
//! an [`ApiRequest`] and handed to an [`HttpTransport`]. One `execute` call is
//! exactly one network attempt; retries live in [`crate::retry`].

use crate::config::{ClientConfig, API_KEY_HEADER};
use crate::error::{D360Error, D360Result};
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::multipart;
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

// ─── Request / response ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartUpload),
}

/// File upload description. Kept as plain data so a fresh form can be built
/// for every attempt.
#[derive(Debug, Clone)]
pub struct MultipartUpload {
    /// Plain text fields sent before the file part.
    pub fields: Vec<(String, String)>,
    pub file_field: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl MultipartUpload {
    fn to_form(&self) -> Result<multipart::Form, TransportFailure> {
        let part = multipart::Part::bytes(self.data.to_vec())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime_type)
            .map_err(|e| TransportFailure::Request(format!("Bad MIME type: {}", e)))?;
        let form = self
            .fields
            .iter()
            .fold(multipart::Form::new(), |form, (k, v)| {
                form.text(k.clone(), v.clone())
            });
        Ok(form.part(self.file_field.clone(), part))
    }
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured base URL, with a leading `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post_json(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(RequestBody::Json(body))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Raw provider response. Any status code, including 4xx/5xx.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parsed JSON body; non-JSON bodies become a JSON string.
    pub fn json_or_text(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|_| Value::String(self.text()))
    }
}

/// One failed attempt, before any response was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// Connection, DNS, TLS, timeout or body-read failure.
    Network(String),
    /// The request could not be built (bad URL, bad header, ...).
    Request(String),
}

impl TransportFailure {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(m) => write!(f, "network error: {}", m),
            Self::Request(m) => write!(f, "invalid request: {}", m),
        }
    }
}

impl std::error::Error for TransportFailure {}

// ─── Transport trait ─────────────────────────────────────────────────

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a single attempt.
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportFailure>;
}

// ─── reqwest implementation ──────────────────────────────────────────

/// Production transport: `reqwest` client bound to a base URL and API key.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> D360Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| D360Error::configuration(format!("HTTP client init failed: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base().to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, request: &ApiRequest) -> Result<url::Url, TransportFailure> {
        let mut url = url::Url::parse(&format!("{}{}", self.base_url, request.path))
            .map_err(|e| TransportFailure::Request(format!("Invalid URL: {}", e)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportFailure> {
        let url = self.url(request)?;
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(API_KEY_HEADER, &self.api_key);
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart(upload) => builder.multipart(upload.to_form()?),
        };

        let resp = builder.send().await.map_err(|e| {
            if e.is_builder() {
                TransportFailure::Request(e.to_string())
            } else {
                TransportFailure::Network(e.to_string())
            }
        })?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| TransportFailure::Network(format!("Reading body failed: {}", e)))?;
        Ok(ApiResponse { status, body })
    }
}
