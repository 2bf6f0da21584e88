//! # d360-client — 360dialog WhatsApp Business API client
//!
//! Client for the 360dialog gateway (`https://waba-v2.360dialog.io`),
//! authenticated with the `D360-API-KEY` header.
//!
//! ## Capabilities
//!
//! - **Messages** – text, media (image/audio/video/document/sticker),
//!   template, interactive (button/list/product/product list) and contact
//!   messages, each with optional reply context.
//! - **Retry** – bounded exponential backoff for network failures; HTTP
//!   responses are never retried.
//! - **Responses** – one `SendResult` model for both the Cloud API and the
//!   legacy response generation.
//! - **Media** – pre-flight size/MIME validation, upload, info, download
//!   (re-rooted onto the gateway) and delete.
//! - **Webhooks** – envelope parsing, per-type dispatch, and a
//!   framework-neutral receiver (challenge verification + POST handling).
//! - **Account** – webhook URL configuration, health status, template listing.

pub mod client;
pub mod config;
pub mod error;
pub mod media;
pub mod messages;
pub mod response;
pub mod retry;
pub mod transport;
pub mod webhooks;

pub use client::{Dialog360Client, TemplateQuery};
pub use config::{ApiGeneration, ClientConfig};
pub use error::{D360Error, D360ErrorCode, D360Result};
pub use media::{validate_media, MediaKind};
pub use messages::{
    ContactCard, ContactMessage, InteractiveMessage, MediaMessage, Message, TemplateComponent,
    TemplateMessage, TemplateParameter, TextMessage,
};
pub use response::{
    HealthStatus, MediaDescriptor, ResponseShape, SendResult, TemplateList, WabaWebhookConfig,
    WabaWebhookUpdate, WebhookConfig,
};
pub use retry::{Backoff, RetryPolicy};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport, TransportFailure};
pub use webhooks::{
    dispatch_envelope, WebhookEventEnvelope, WebhookHandler, WebhookReceiver, WebhookReply,
};
