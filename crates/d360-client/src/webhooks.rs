//! Inbound webhook handling.
//!
//! Handles:
//! - Verification challenge (`GET`, `hub_mode` / `hub_verify_token` / `hub_challenge`)
//! - Envelope parsing of message and status events (`POST`)
//! - Dispatch of parsed events to a [`WebhookHandler`] by message type
//!
//! [`WebhookReceiver`] packages the HTTP contract without tying it to a web
//! framework; the caller maps its [`WebhookReply`] onto a real response.

use crate::error::D360Result;
use crate::media::MediaKind;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

// ═══════════════════════════════════════════════════════════════════════
//  Envelope model
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebhookMetadata {
    pub display_phone_number: Option<String>,
    pub phone_number_id: Option<String>,
}

/// Events carried by one webhook POST.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebhookEventEnvelope {
    /// `changes[0].field`, normally `messages`.
    pub field: Option<String>,
    pub metadata: WebhookMetadata,
    pub messages: Vec<InboundMessage>,
    pub statuses: Vec<StatusEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundMessage {
    pub id: String,
    pub from: String,
    /// Unix seconds as sent by the provider.
    pub timestamp: String,
    pub received_at: Option<DateTime<Utc>>,
    pub message_type: String,
    pub content: InboundContent,
    pub profile_name: Option<String>,
    /// Id of the message this one replies to.
    pub context_message_id: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum InboundContent {
    Text { body: String },
    Image(InboundMedia),
    Audio(InboundMedia),
    Video(InboundMedia),
    Document(InboundMedia),
    Location(Location),
    Contacts(Vec<Value>),
    Interactive(InteractiveReply),
    /// Any other type tag (sticker, reaction, button, order, ...).
    Unsupported(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InboundMedia {
    pub id: String,
    pub mime_type: Option<String>,
    pub sha256: Option<String>,
    pub caption: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum InteractiveReply {
    Button {
        id: String,
        title: String,
    },
    List {
        id: String,
        title: String,
        description: Option<String>,
    },
    Other(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
    Failed,
    Other(String),
}

impl DeliveryStatus {
    fn parse(raw: &str) -> Self {
        match raw {
            "sent" => Self::Sent,
            "delivered" => Self::Delivered,
            "read" => Self::Read,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusError {
    pub code: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusEvent {
    pub id: String,
    pub status: DeliveryStatus,
    pub timestamp: String,
    pub received_at: Option<DateTime<Utc>>,
    pub recipient_id: String,
    pub errors: Vec<StatusError>,
}

impl WebhookEventEnvelope {
    /// Read `entry[0].changes[0].value`. Missing pieces give empty lists.
    pub fn from_value(payload: &Value) -> Self {
        let change = &payload["entry"][0]["changes"][0];
        let value = &change["value"];

        let contacts = value["contacts"].as_array().cloned().unwrap_or_default();
        let messages = value["messages"]
            .as_array()
            .map(|arr| arr.iter().map(|m| parse_message(m, &contacts)).collect())
            .unwrap_or_default();
        let statuses = value["statuses"]
            .as_array()
            .map(|arr| arr.iter().map(parse_status).collect())
            .unwrap_or_default();

        Self {
            field: change["field"].as_str().map(String::from),
            metadata: WebhookMetadata {
                display_phone_number: value["metadata"]["display_phone_number"]
                    .as_str()
                    .map(String::from),
                phone_number_id: value["metadata"]["phone_number_id"]
                    .as_str()
                    .map(String::from),
            },
            messages,
            statuses,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.statuses.is_empty()
    }
}

fn opt_str(v: &Value) -> Option<String> {
    v.as_str().map(String::from)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = raw.trim().parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

fn parse_media(v: &Value) -> InboundMedia {
    InboundMedia {
        id: v["id"].as_str().unwrap_or_default().to_string(),
        mime_type: opt_str(&v["mime_type"]),
        sha256: opt_str(&v["sha256"]),
        caption: opt_str(&v["caption"]),
        filename: opt_str(&v["filename"]),
    }
}

fn parse_interactive(v: &Value) -> InteractiveReply {
    match v["type"].as_str().unwrap_or_default() {
        "button_reply" => InteractiveReply::Button {
            id: v["button_reply"]["id"].as_str().unwrap_or_default().to_string(),
            title: v["button_reply"]["title"].as_str().unwrap_or_default().to_string(),
        },
        "list_reply" => InteractiveReply::List {
            id: v["list_reply"]["id"].as_str().unwrap_or_default().to_string(),
            title: v["list_reply"]["title"].as_str().unwrap_or_default().to_string(),
            description: opt_str(&v["list_reply"]["description"]),
        },
        other => InteractiveReply::Other(other.to_string()),
    }
}

fn parse_message(msg: &Value, contacts: &[Value]) -> InboundMessage {
    let from = msg["from"].as_str().unwrap_or_default().to_string();
    let message_type = msg["type"].as_str().unwrap_or("unknown").to_string();
    let body = &msg[message_type.as_str()];

    let content = match message_type.as_str() {
        "text" => InboundContent::Text {
            body: body["body"].as_str().unwrap_or_default().to_string(),
        },
        "image" => InboundContent::Image(parse_media(body)),
        "audio" => InboundContent::Audio(parse_media(body)),
        "video" => InboundContent::Video(parse_media(body)),
        "document" => InboundContent::Document(parse_media(body)),
        "location" => InboundContent::Location(Location {
            latitude: body["latitude"].as_f64().unwrap_or_default(),
            longitude: body["longitude"].as_f64().unwrap_or_default(),
            name: opt_str(&body["name"]),
            address: opt_str(&body["address"]),
        }),
        "contacts" => InboundContent::Contacts(body.as_array().cloned().unwrap_or_default()),
        "interactive" => InboundContent::Interactive(parse_interactive(body)),
        other => InboundContent::Unsupported(other.to_string()),
    };

    let profile_name = contacts
        .iter()
        .find(|c| c["wa_id"].as_str() == Some(from.as_str()))
        .or_else(|| contacts.first())
        .and_then(|c| opt_str(&c["profile"]["name"]));

    let timestamp = msg["timestamp"].as_str().unwrap_or_default().to_string();
    InboundMessage {
        id: msg["id"].as_str().unwrap_or_default().to_string(),
        from,
        received_at: parse_timestamp(&timestamp),
        timestamp,
        message_type,
        content,
        profile_name,
        context_message_id: opt_str(&msg["context"]["id"]),
        raw: msg.clone(),
    }
}

fn parse_status(status: &Value) -> StatusEvent {
    let errors = status["errors"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|e| StatusError {
                    code: match &e["code"] {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    },
                    title: opt_str(&e["title"]),
                    message: opt_str(&e["message"]),
                })
                .collect()
        })
        .unwrap_or_default();
    let timestamp = status["timestamp"].as_str().unwrap_or_default().to_string();
    StatusEvent {
        id: status["id"].as_str().unwrap_or_default().to_string(),
        status: DeliveryStatus::parse(status["status"].as_str().unwrap_or_default()),
        received_at: parse_timestamp(&timestamp),
        timestamp,
        recipient_id: status["recipient_id"].as_str().unwrap_or_default().to_string(),
        errors,
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Dispatch
// ═══════════════════════════════════════════════════════════════════════

/// Per-type hooks for inbound events. Every hook defaults to a no-op, so an
/// implementation only overrides what it cares about.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn on_text(&self, _message: &InboundMessage, _body: &str) -> D360Result<()> {
        Ok(())
    }

    async fn on_media(
        &self,
        _message: &InboundMessage,
        _kind: MediaKind,
        _media: &InboundMedia,
    ) -> D360Result<()> {
        Ok(())
    }

    async fn on_location(&self, _message: &InboundMessage, _location: &Location) -> D360Result<()> {
        Ok(())
    }

    async fn on_contacts(&self, _message: &InboundMessage, _contacts: &[Value]) -> D360Result<()> {
        Ok(())
    }

    async fn on_interactive(
        &self,
        _message: &InboundMessage,
        _reply: &InteractiveReply,
    ) -> D360Result<()> {
        Ok(())
    }

    async fn on_unsupported(&self, _message: &InboundMessage) -> D360Result<()> {
        Ok(())
    }

    async fn on_status(&self, _status: &StatusEvent) -> D360Result<()> {
        Ok(())
    }
}

/// Handler that ignores everything.
pub struct NoopHandler;

impl WebhookHandler for NoopHandler {}

/// Feed every message (in order), then every status, to `handler`.
/// Stops at the first hook error.
pub async fn dispatch_envelope(
    envelope: &WebhookEventEnvelope,
    handler: &dyn WebhookHandler,
) -> D360Result<()> {
    for message in &envelope.messages {
        debug!("Inbound {} message {} from {}", message.message_type, message.id, message.from);
        match &message.content {
            InboundContent::Text { body } => handler.on_text(message, body).await?,
            InboundContent::Image(m) => handler.on_media(message, MediaKind::Image, m).await?,
            InboundContent::Audio(m) => handler.on_media(message, MediaKind::Audio, m).await?,
            InboundContent::Video(m) => handler.on_media(message, MediaKind::Video, m).await?,
            InboundContent::Document(m) => {
                handler.on_media(message, MediaKind::Document, m).await?
            }
            InboundContent::Location(l) => handler.on_location(message, l).await?,
            InboundContent::Contacts(c) => handler.on_contacts(message, c).await?,
            InboundContent::Interactive(r) => handler.on_interactive(message, r).await?,
            InboundContent::Unsupported(tag) => {
                debug!("Unsupported message type {} ({})", tag, message.id);
                handler.on_unsupported(message).await?
            }
        }
    }
    for status in &envelope.statuses {
        debug!("Status {:?} for {}", status.status, status.id);
        handler.on_status(status).await?;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  Receiver
// ═══════════════════════════════════════════════════════════════════════

/// Framework-neutral HTTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl WebhookReply {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
        }
    }

    fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }
}

/// Verification plus POST handling for a webhook endpoint.
pub struct WebhookReceiver {
    verify_token: String,
    handler: Arc<dyn WebhookHandler>,
}

impl WebhookReceiver {
    pub fn new(verify_token: impl Into<String>, handler: Arc<dyn WebhookHandler>) -> Self {
        Self {
            verify_token: verify_token.into(),
            handler,
        }
    }

    /// Answer the subscription challenge. Both `hub_mode` and `hub.mode`
    /// style keys are accepted. An empty configured token never matches.
    pub fn verify(&self, query: &HashMap<String, String>) -> WebhookReply {
        let param = |name: &str| {
            query
                .get(&format!("hub_{}", name))
                .or_else(|| query.get(&format!("hub.{}", name)))
                .map(String::as_str)
                .unwrap_or_default()
        };
        let mode = param("mode");
        let token = param("verify_token");

        if mode == "subscribe" && !self.verify_token.is_empty() && token == self.verify_token {
            info!("Webhook verification challenge accepted");
            WebhookReply::text(200, param("challenge"))
        } else {
            warn!("Webhook verification failed (mode={:?})", mode);
            WebhookReply::json(403, json!({ "error": "Verification failed" }))
        }
    }

    /// Parse and dispatch one POST body.
    pub async fn receive(&self, body: &[u8]) -> WebhookReply {
        let payload: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => {
                warn!("Unparseable webhook body: {}", e);
                return WebhookReply::json(400, json!({ "error": "Invalid JSON payload" }));
            }
        };

        let envelope = WebhookEventEnvelope::from_value(&payload);
        debug!(
            "Webhook envelope: {} message(s), {} status(es)",
            envelope.messages.len(),
            envelope.statuses.len()
        );
        match dispatch_envelope(&envelope, self.handler.as_ref()).await {
            Ok(()) => WebhookReply::json(200, json!({ "status": "ok" })),
            Err(e) => {
                error!("Webhook handler failed: {}", e);
                WebhookReply::json(500, json!({ "error": e.message }))
            }
        }
    }

    /// Route by HTTP method: `GET` verifies, `POST` receives, anything else
    /// is 405.
    pub async fn handle(
        &self,
        method: &str,
        query: &HashMap<String, String>,
        body: &[u8],
    ) -> WebhookReply {
        if method.eq_ignore_ascii_case("GET") {
            self.verify(query)
        } else if method.eq_ignore_ascii_case("POST") {
            self.receive(body).await
        } else {
            WebhookReply::json(405, json!({ "error": "Method not allowed" }))
        }
    }
}
