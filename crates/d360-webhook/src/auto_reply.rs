//! Default inbound behaviour: greet people who say hello, answer the
//! help/info buttons, and log everything else.

use async_trait::async_trait;
use d360_client::webhooks::{
    DeliveryStatus, InboundMedia, InboundMessage, InteractiveReply, Location, StatusEvent,
};
use d360_client::{D360Result, Dialog360Client, MediaKind, Message, TextMessage, WebhookHandler};
use serde_json::Value;
use tracing::{debug, info, warn};

pub const GREETING_REPLY: &str =
    "Hello! Thanks for your message. We have received it and will get back to you shortly.";
pub const HELP_REPLY: &str = "Need a hand? Reply with a short description of the problem \
     and our support team will pick it up.";
pub const INFO_REPLY: &str = "We are available Monday to Friday, 9:00 to 17:00. \
     Outside those hours we reply the next working day.";

/// Whether `body` contains "hello" or "hi" as a word.
pub fn is_greeting(body: &str) -> bool {
    body.split(|c: char| !c.is_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case("hello") || word.eq_ignore_ascii_case("hi"))
}

/// Text to send back for an interactive reply, if any.
pub fn reply_for_selection(reply: &InteractiveReply) -> Option<String> {
    match reply {
        InteractiveReply::Button { id, title } => Some(match id.as_str() {
            "btn_help" => HELP_REPLY.to_string(),
            "btn_info" => INFO_REPLY.to_string(),
            _ => format!("You selected: {}", title),
        }),
        InteractiveReply::List { title, .. } => Some(format!("You selected: {}", title)),
        InteractiveReply::Other(_) => None,
    }
}

pub struct AutoReply {
    client: Dialog360Client,
}

impl AutoReply {
    pub fn new(client: Dialog360Client) -> Self {
        Self { client }
    }

    /// Send `text` quoting `message`. Delivery problems are logged rather
    /// than failing the webhook, so the provider does not redeliver the event.
    async fn reply(&self, message: &InboundMessage, text: &str) {
        let outgoing =
            Message::from(TextMessage::new(&message.from, text)).in_reply_to(&message.id);
        match self.client.send_message(&outgoing).await {
            Ok(result) if result.success => {
                info!(
                    to = %message.from,
                    message_id = result.message_id.as_deref().unwrap_or(""),
                    "auto-reply sent"
                );
            }
            Ok(result) => {
                warn!(
                    to = %message.from,
                    code = result.error_code.as_deref().unwrap_or(""),
                    error = result.error_message.as_deref().unwrap_or(""),
                    "auto-reply rejected"
                );
            }
            Err(e) => warn!(to = %message.from, error = %e, "auto-reply failed"),
        }
    }
}

#[async_trait]
impl WebhookHandler for AutoReply {
    async fn on_text(&self, message: &InboundMessage, body: &str) -> D360Result<()> {
        info!(from = %message.from, id = %message.id, "text message: {}", body);
        if is_greeting(body) {
            self.reply(message, GREETING_REPLY).await;
        }
        Ok(())
    }

    async fn on_media(
        &self,
        message: &InboundMessage,
        kind: MediaKind,
        media: &InboundMedia,
    ) -> D360Result<()> {
        info!(
            from = %message.from,
            kind = %kind,
            media_id = %media.id,
            mime = media.mime_type.as_deref().unwrap_or(""),
            "media message"
        );
        Ok(())
    }

    async fn on_location(&self, message: &InboundMessage, location: &Location) -> D360Result<()> {
        info!(
            from = %message.from,
            lat = location.latitude,
            lon = location.longitude,
            "location message"
        );
        Ok(())
    }

    async fn on_contacts(&self, message: &InboundMessage, contacts: &[Value]) -> D360Result<()> {
        info!(from = %message.from, count = contacts.len(), "contacts message");
        Ok(())
    }

    async fn on_interactive(
        &self,
        message: &InboundMessage,
        reply: &InteractiveReply,
    ) -> D360Result<()> {
        match reply_for_selection(reply) {
            Some(text) => self.reply(message, &text).await,
            None => debug!(from = %message.from, "interactive reply without a handler"),
        }
        Ok(())
    }

    async fn on_status(&self, status: &StatusEvent) -> D360Result<()> {
        match &status.status {
            DeliveryStatus::Failed => {
                for err in &status.errors {
                    warn!(
                        id = %status.id,
                        code = err.code.as_deref().unwrap_or(""),
                        title = err.title.as_deref().unwrap_or(""),
                        "message failed"
                    );
                }
                if status.errors.is_empty() {
                    warn!(id = %status.id, "message failed");
                }
            }
            DeliveryStatus::Other(raw) => debug!(id = %status.id, status = %raw, "status update"),
            other => info!(
                id = %status.id,
                recipient = %status.recipient_id,
                "message {:?}",
                other
            ),
        }
        Ok(())
    }
}
