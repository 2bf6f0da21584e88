//! Client configuration.
//!
//! `ClientConfig` is a plain value: built once, validated when the client is
//! constructed, then only ever read.

use crate::error::{D360Error, D360Result};
use crate::retry::Backoff;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://waba-v2.360dialog.io";
pub const API_KEY_HEADER: &str = "D360-API-KEY";

/// Provider API generation. Decides the send endpoint and which response
/// shape is expected first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiGeneration {
    /// waba-v2 Cloud API (`POST /messages`).
    #[default]
    CloudApi,
    /// On-premise era API (`POST /v1/messages`).
    Legacy,
}

impl ApiGeneration {
    pub fn messages_path(&self) -> &'static str {
        match self {
            Self::CloudApi => "/messages",
            Self::Legacy => "/v1/messages",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cloud" | "cloud_api" | "v2" => Some(Self::CloudApi),
            "legacy" | "v1" => Some(Self::Legacy),
            _ => None,
        }
    }
}

/// API configuration for connecting to 360dialog.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// 360dialog API key (sent as `D360-API-KEY`).
    pub api_key: String,
    /// Phone number / channel the key belongs to.
    pub phone_number_id: String,
    /// Base URL override (default: `https://waba-v2.360dialog.io`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_generation: ApiGeneration,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_sec: u32,
    /// Maximum attempts for transient (network) failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff time unit; the n-th retry waits `unit * 2^n`.
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
    /// Optional ceiling for a single backoff sleep.
    #[serde(default)]
    pub max_backoff_ms: Option<u64>,
    /// Optional random extra delay in `[0, jitter)` added to each sleep.
    #[serde(default)]
    pub backoff_jitter_ms: Option<u64>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("phone_number_id", &self.phone_number_id)
            .field("base_url", &self.base_url)
            .field("api_generation", &self.api_generation)
            .field("timeout_sec", &self.timeout_sec)
            .field("max_retries", &self.max_retries)
            .field("backoff_unit_ms", &self.backoff_unit_ms)
            .field("max_backoff_ms", &self.max_backoff_ms)
            .field("backoff_jitter_ms", &self.backoff_jitter_ms)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout() -> u32 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_backoff_unit_ms() -> u64 {
    1000
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, phone_number_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            phone_number_id: phone_number_id.into(),
            base_url: default_base_url(),
            api_generation: ApiGeneration::default(),
            timeout_sec: default_timeout(),
            max_retries: default_max_retries(),
            backoff_unit_ms: default_backoff_unit_ms(),
            max_backoff_ms: None,
            backoff_jitter_ms: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_generation(mut self, generation: ApiGeneration) -> Self {
        self.api_generation = generation;
        self
    }

    pub fn with_timeout_sec(mut self, timeout_sec: u32) -> Self {
        self.timeout_sec = timeout_sec;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(
        mut self,
        unit_ms: u64,
        max_backoff_ms: Option<u64>,
        jitter_ms: Option<u64>,
    ) -> Self {
        self.backoff_unit_ms = unit_ms;
        self.max_backoff_ms = max_backoff_ms;
        self.backoff_jitter_ms = jitter_ms;
        self
    }

    /// Reject configurations that can never make a successful call.
    pub fn validate(&self) -> D360Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(D360Error::configuration("API key must not be empty"));
        }
        if self.max_retries == 0 {
            return Err(D360Error::configuration("max_retries must be at least 1"));
        }
        if self.timeout_sec == 0 {
            return Err(D360Error::configuration("timeout_sec must be positive"));
        }
        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            D360Error::configuration(format!("Invalid base URL {}: {}", self.base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(D360Error::configuration(format!(
                "Base URL must be http(s): {}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Base URL without trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec as u64)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            unit: Duration::from_millis(self.backoff_unit_ms),
            max_delay: self.max_backoff_ms.map(Duration::from_millis),
            jitter: self.backoff_jitter_ms.map(Duration::from_millis),
        }
    }

    /// Load from `D360_*` environment variables (`DIALOG360_API_KEY` and
    /// `DIALOG360_PHONE_NUMBER_ID` are accepted as fallbacks).
    pub fn from_env() -> D360Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, dotenv map, ...).
    pub fn from_lookup<F>(lookup: F) -> D360Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("D360_API_KEY")
            .or_else(|| lookup("DIALOG360_API_KEY"))
            .ok_or_else(|| D360Error::configuration("D360_API_KEY is not set"))?;
        let phone_number_id = lookup("D360_PHONE_NUMBER_ID")
            .or_else(|| lookup("DIALOG360_PHONE_NUMBER_ID"))
            .unwrap_or_default();

        let mut config = Self::new(api_key, phone_number_id);
        if let Some(url) = lookup("D360_BASE_URL") {
            config.base_url = url;
        }
        if let Some(raw) = lookup("D360_API_GENERATION") {
            config.api_generation = ApiGeneration::parse(&raw).ok_or_else(|| {
                D360Error::configuration(format!("Unknown D360_API_GENERATION: {}", raw))
            })?;
        }
        if let Some(raw) = lookup("D360_TIMEOUT") {
            config.timeout_sec = parse_number("D360_TIMEOUT", &raw)?;
        }
        if let Some(raw) = lookup("D360_RETRY_ATTEMPTS") {
            config.max_retries = parse_number("D360_RETRY_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = lookup("D360_BACKOFF_UNIT_MS") {
            config.backoff_unit_ms = parse_number("D360_BACKOFF_UNIT_MS", &raw)?;
        }
        if let Some(raw) = lookup("D360_MAX_BACKOFF_MS") {
            config.max_backoff_ms = Some(parse_number("D360_MAX_BACKOFF_MS", &raw)?);
        }
        if let Some(raw) = lookup("D360_BACKOFF_JITTER_MS") {
            config.backoff_jitter_ms = Some(parse_number("D360_BACKOFF_JITTER_MS", &raw)?);
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> D360Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| D360Error::configuration(format!("{} is not a number: {}", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::D360ErrorCode;
    use std::collections::HashMap;

    #[test]
    fn test_debug_hides_api_key() {
        let config = ClientConfig::new("sk-live-secret", "4930609859535");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-live-secret"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("4930609859535"));
    }

    #[test]
    fn test_default_config_values() {
        let json = r#"{"apiKey":"key","phoneNumberId":"123"}"#;
        let config: ClientConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.base_url, "https://waba-v2.360dialog.io");
        assert_eq!(config.api_generation, ApiGeneration::CloudApi);
        assert_eq!(config.timeout_sec, 30);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_unit_ms, 1000);
        assert!(config.max_backoff_ms.is_none());
    }

    #[test]
    fn test_validate_rejects_empty_key() {
        let err = ClientConfig::new("  ", "123").validate().unwrap_err();
        assert_eq!(err.code, D360ErrorCode::Configuration);
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let err = ClientConfig::new("key", "123")
            .with_max_retries(0)
            .validate()
            .unwrap_err();
        assert!(err.message.contains("max_retries"));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        assert!(ClientConfig::new("key", "1")
            .with_base_url("not a url")
            .validate()
            .is_err());
        assert!(ClientConfig::new("key", "1")
            .with_base_url("ftp://waba.example")
            .validate()
            .is_err());
    }

    #[test]
    fn test_base_strips_trailing_slash() {
        let config = ClientConfig::new("key", "1").with_base_url("https://waba-v2.360dialog.io/");
        assert_eq!(config.base(), "https://waba-v2.360dialog.io");
    }

    #[test]
    fn test_messages_path_by_generation() {
        assert_eq!(ApiGeneration::CloudApi.messages_path(), "/messages");
        assert_eq!(ApiGeneration::Legacy.messages_path(), "/v1/messages");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("D360_API_KEY", "secret"),
            ("D360_PHONE_NUMBER_ID", "4930"),
            ("D360_BASE_URL", "https://waba-sandbox.360dialog.io"),
            ("D360_API_GENERATION", "legacy"),
            ("D360_TIMEOUT", "10"),
            ("D360_RETRY_ATTEMPTS", "5"),
            ("D360_MAX_BACKOFF_MS", "8000"),
        ]
        .into_iter()
        .collect();
        let config =
            ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.phone_number_id, "4930");
        assert_eq!(config.base_url, "https://waba-sandbox.360dialog.io");
        assert_eq!(config.api_generation, ApiGeneration::Legacy);
        assert_eq!(config.timeout_sec, 10);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.max_backoff_ms, Some(8000));
    }

    #[test]
    fn test_from_lookup_missing_key() {
        let err = ClientConfig::from_lookup(|_| None).unwrap_err();
        assert_eq!(err.code, D360ErrorCode::Configuration);
    }

    #[test]
    fn test_from_lookup_dialog360_fallback() {
        let config = ClientConfig::from_lookup(|k| match k {
            "DIALOG360_API_KEY" => Some("old-key".into()),
            "DIALOG360_PHONE_NUMBER_ID" => Some("77".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.api_key, "old-key");
        assert_eq!(config.phone_number_id, "77");
    }

    #[test]
    fn test_from_lookup_bad_number() {
        let err = ClientConfig::from_lookup(|k| match k {
            "D360_API_KEY" => Some("k".into()),
            "D360_TIMEOUT" => Some("soon".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(err.message.contains("D360_TIMEOUT"));
    }
}
