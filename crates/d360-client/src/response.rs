//! Provider response normalization.
//!
//! The gateway has answered in two incompatible shapes over its lifetime. A
//! send response is tried against each [`ResponseShape`] in order and the first
//! match wins; no match means the send failed, and the error fields are dug
//! out of whichever error envelope is present.
//!
//! The `from_value` constructors never fail: missing or mistyped fields fall
//! back to defaults and the raw payload is kept for inspection.

use crate::config::ApiGeneration;
use crate::transport::ApiResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ═══════════════════════════════════════════════════════════════════════
//  Send result
// ═══════════════════════════════════════════════════════════════════════

/// Response generation a send result was recognised as.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// `{"messages":[{"id":...}],"contacts":[{"wa_id":...}]}`
    CloudApi,
    /// `{"id":...,"status":...}`
    Legacy,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ShapeMatch {
    message_id: String,
    status: Option<String>,
    recipient_wa_id: Option<String>,
}

impl ResponseShape {
    pub const ORDER: [ResponseShape; 2] = [ResponseShape::CloudApi, ResponseShape::Legacy];

    /// [`Self::ORDER`] with the configured generation's own shape first.
    pub fn order_for(generation: ApiGeneration) -> [ResponseShape; 2] {
        match generation {
            ApiGeneration::CloudApi => Self::ORDER,
            ApiGeneration::Legacy => [ResponseShape::Legacy, ResponseShape::CloudApi],
        }
    }

    fn try_match(&self, v: &Value) -> Option<ShapeMatch> {
        match self {
            Self::CloudApi => {
                let message = &v["messages"][0];
                let id = message["id"].as_str()?;
                Some(ShapeMatch {
                    message_id: id.to_string(),
                    status: message["message_status"].as_str().map(String::from),
                    recipient_wa_id: v["contacts"][0]["wa_id"].as_str().map(String::from),
                })
            }
            Self::Legacy => {
                let id = v["id"].as_str()?;
                if v.get("status").is_none() && v.get("messages").map_or(false, Value::is_array) {
                    return None;
                }
                Some(ShapeMatch {
                    message_id: id.to_string(),
                    status: v["status"].as_str().map(String::from),
                    recipient_wa_id: None,
                })
            }
        }
    }
}

/// Outcome of a send call. Provider-side rejections land here as
/// `success == false`; only transport and local faults are errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendResult {
    pub success: bool,
    /// Set iff `success`.
    pub message_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub status: Option<String>,
    pub recipient_wa_id: Option<String>,
    pub http_status: Option<u16>,
    pub shape: Option<ResponseShape>,
    /// Provider body as received; non-JSON bodies are kept as a string.
    pub raw: Value,
}

impl SendResult {
    pub fn from_value(raw: Value, http_status: Option<u16>) -> Self {
        Self::from_value_ordered(raw, http_status, &ResponseShape::ORDER)
    }

    pub fn from_value_ordered(
        raw: Value,
        http_status: Option<u16>,
        order: &[ResponseShape],
    ) -> Self {
        let matched = order
            .iter()
            .find_map(|shape| shape.try_match(&raw).map(|m| (*shape, m)));

        match matched {
            Some((shape, m)) => Self {
                success: true,
                message_id: Some(m.message_id),
                error_code: None,
                error_message: None,
                status: m.status,
                recipient_wa_id: m.recipient_wa_id,
                http_status,
                shape: Some(shape),
                raw,
            },
            None => {
                let (error_code, error_message) = extract_error(&raw);
                Self {
                    success: false,
                    message_id: None,
                    error_code,
                    error_message,
                    status: None,
                    recipient_wa_id: None,
                    http_status,
                    shape: None,
                    raw,
                }
            }
        }
    }

    pub fn from_response(resp: &ApiResponse, generation: ApiGeneration) -> Self {
        Self::from_value_ordered(
            resp.json_or_text(),
            Some(resp.status),
            &ResponseShape::order_for(generation),
        )
    }
}

/// `(code, message)` from `errors[0]` or `error`, whichever is present.
pub fn extract_error(v: &Value) -> (Option<String>, Option<String>) {
    let first = &v["errors"][0];
    if first.is_object() {
        let message = first["message"]
            .as_str()
            .or_else(|| first["title"].as_str())
            .or_else(|| first["details"].as_str())
            .map(String::from);
        return (code_string(&first["code"]), message);
    }
    let err = &v["error"];
    if err.is_object() {
        return (
            code_string(&err["code"]),
            err["message"].as_str().map(String::from),
        );
    }
    (None, None)
}

fn code_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Media
// ═══════════════════════════════════════════════════════════════════════

/// Media metadata from `GET /{media-id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaDescriptor {
    pub id: String,
    /// Short-lived download URL on the provider's CDN.
    pub url: String,
    pub mime_type: String,
    pub sha256: String,
    pub file_size: u64,
    pub raw: Value,
}

impl MediaDescriptor {
    pub fn from_value(raw: Value) -> Self {
        let file_size = match &raw["file_size"] {
            Value::Number(n) => n.as_u64().unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };
        Self {
            id: str_field(&raw, "id"),
            url: str_field(&raw, "url"),
            mime_type: str_field(&raw, "mime_type"),
            sha256: str_field(&raw, "sha256"),
            file_size,
            raw,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }

    pub fn is_document(&self) -> bool {
        self.mime_type.starts_with("application/") || self.mime_type.starts_with("text/")
    }

    pub fn file_extension(&self) -> &'static str {
        match crate::media::base_mime(&self.mime_type).as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "audio/mpeg" => "mp3",
            "audio/ogg" => "ogg",
            "audio/wav" => "wav",
            "audio/aac" => "aac",
            "audio/amr" => "amr",
            "video/mp4" => "mp4",
            "video/3gpp" | "video/3gp" => "3gp",
            "application/pdf" => "pdf",
            "application/msword" => "doc",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
            "application/vnd.ms-excel" => "xls",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
            "application/vnd.ms-powerpoint" => "ppt",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => "pptx",
            "text/plain" => "txt",
            _ => "bin",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Webhook configuration
// ═══════════════════════════════════════════════════════════════════════

/// Phone-number level webhook (`/v1/configs/webhook`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebhookConfig {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub raw: Value,
}

impl WebhookConfig {
    pub fn from_value(raw: Value) -> Self {
        Self {
            url: str_field(&raw, "url"),
            headers: string_map(&raw["headers"]),
            raw,
        }
    }
}

/// Account level webhook (`/waba_webhook`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WabaWebhookConfig {
    pub waba_id: String,
    pub phone_numbers: Vec<String>,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub raw: Value,
}

impl WabaWebhookConfig {
    pub fn from_value(raw: Value) -> Self {
        let phone_numbers = raw["phone_numbers"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|p| match p {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            waba_id: str_field(&raw, "waba_id"),
            phone_numbers,
            url: str_field(&raw, "url"),
            headers: string_map(&raw["headers"]),
            raw,
        }
    }
}

/// Acknowledgement for `POST /waba_webhook`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WabaWebhookUpdate {
    pub message: String,
    pub raw: Value,
}

impl WabaWebhookUpdate {
    pub fn from_value(raw: Value) -> Self {
        Self {
            message: str_field(&raw, "message"),
            raw,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Templates
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TemplateList {
    pub count: u64,
    pub filters: Value,
    pub limit: u64,
    pub offset: u64,
    pub sort: Value,
    pub total: u64,
    pub templates: Vec<Value>,
}

impl TemplateList {
    pub fn from_value(raw: Value) -> Self {
        Self {
            count: raw["count"].as_u64().unwrap_or(0),
            filters: raw
                .get("filters")
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default())),
            limit: raw["limit"].as_u64().unwrap_or(0),
            offset: raw["offset"].as_u64().unwrap_or(0),
            sort: raw.get("sort").cloned().unwrap_or_else(|| Value::Array(Vec::new())),
            total: raw["total"].as_u64().unwrap_or(0),
            templates: raw["waba_templates"].as_array().cloned().unwrap_or_default(),
        }
    }

    /// Template names, in listing order.
    pub fn names(&self) -> Vec<&str> {
        self.templates
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Health
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthEntity {
    pub entity_type: String,
    pub id: String,
    pub can_send_message: String,
    pub errors: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    /// `AVAILABLE`, `LIMITED` or `BLOCKED`.
    pub can_send_message: String,
    pub entities: Vec<HealthEntity>,
    pub raw: Value,
}

impl HealthStatus {
    pub fn from_value(raw: Value) -> Self {
        let health = &raw["health_status"];
        let entities = health["entities"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .map(|e| HealthEntity {
                        entity_type: str_field(e, "entity_type"),
                        id: str_field(e, "id"),
                        can_send_message: str_field(e, "can_send_message"),
                        errors: e["errors"].as_array().cloned().unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            can_send_message: str_field(health, "can_send_message"),
            entities,
            raw,
        }
    }

    pub fn is_available(&self) -> bool {
        self.can_send_message.eq_ignore_ascii_case("AVAILABLE")
    }
}

// ─── helpers ─────────────────────────────────────────────────────────

fn str_field(v: &Value, key: &str) -> String {
    v[key].as_str().unwrap_or_default().to_string()
}

fn string_map(v: &Value) -> HashMap<String, String> {
    v.as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, val)| {
                    let s = match val {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), s)
                })
                .collect()
        })
        .unwrap_or_default()
}
