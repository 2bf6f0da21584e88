//! Outbound message model.
//!
//! A [`Message`] is one of five variants. Each variant owns its recipient and
//! content, is built through constructors plus consuming `with_*` calls, and
//! renders to the provider payload without touching the network.

use crate::error::{D360Error, D360Result};
use crate::media::MediaKind;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const MESSAGING_PRODUCT: &str = "whatsapp";
pub const DEFAULT_TEMPLATE_LANGUAGE: &str = "en_US";

// ═══════════════════════════════════════════════════════════════════════
//  Message union
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text(TextMessage),
    Media(MediaMessage),
    Template(TemplateMessage),
    Interactive(InteractiveMessage),
    Contact(ContactMessage),
}

impl Message {
    /// Recipient phone number.
    pub fn to(&self) -> &str {
        match self {
            Self::Text(m) => &m.to,
            Self::Media(m) => &m.to,
            Self::Template(m) => &m.to,
            Self::Interactive(m) => &m.to,
            Self::Contact(m) => &m.to,
        }
    }

    /// Provider `type` tag; also the key the payload is nested under.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Media(m) => m.kind.as_str(),
            Self::Template(_) => "template",
            Self::Interactive(_) => "interactive",
            Self::Contact(_) => "contacts",
        }
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.context().as_deref()
    }

    /// Quote an earlier message (`context.message_id`).
    pub fn in_reply_to(mut self, message_id: impl Into<String>) -> Self {
        *self.context_mut() = Some(message_id.into());
        self
    }

    fn context(&self) -> &Option<String> {
        match self {
            Self::Text(m) => &m.reply_to,
            Self::Media(m) => &m.reply_to,
            Self::Template(m) => &m.reply_to,
            Self::Interactive(m) => &m.reply_to,
            Self::Contact(m) => &m.reply_to,
        }
    }

    fn context_mut(&mut self) -> &mut Option<String> {
        match self {
            Self::Text(m) => &mut m.reply_to,
            Self::Media(m) => &mut m.reply_to,
            Self::Template(m) => &mut m.reply_to,
            Self::Interactive(m) => &mut m.reply_to,
            Self::Contact(m) => &mut m.reply_to,
        }
    }

    /// Type-specific content, i.e. the value stored under [`Self::type_tag`].
    pub fn payload(&self) -> Value {
        match self {
            Self::Text(m) => m.payload(),
            Self::Media(m) => m.payload(),
            Self::Template(m) => m.payload(),
            Self::Interactive(m) => m.payload(),
            Self::Contact(m) => m.payload(),
        }
    }

    /// Full JSON body for `POST /messages`.
    pub fn to_request_body(&self) -> Value {
        let mut body = json!({
            "messaging_product": MESSAGING_PRODUCT,
            "recipient_type": "individual",
            "to": self.to(),
            "type": self.type_tag(),
        });
        body[self.type_tag()] = self.payload();
        if let Some(mid) = self.reply_to() {
            body["context"] = json!({ "message_id": mid });
        }
        body
    }
}

impl From<TextMessage> for Message {
    fn from(m: TextMessage) -> Self {
        Self::Text(m)
    }
}

impl From<MediaMessage> for Message {
    fn from(m: MediaMessage) -> Self {
        Self::Media(m)
    }
}

impl From<TemplateMessage> for Message {
    fn from(m: TemplateMessage) -> Self {
        Self::Template(m)
    }
}

impl From<InteractiveMessage> for Message {
    fn from(m: InteractiveMessage) -> Self {
        Self::Interactive(m)
    }
}

impl From<ContactMessage> for Message {
    fn from(m: ContactMessage) -> Self {
        Self::Contact(m)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Text
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct TextMessage {
    to: String,
    body: String,
    preview_url: bool,
    reply_to: Option<String>,
}

impl TextMessage {
    pub fn new(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            body: body.into(),
            preview_url: false,
            reply_to: None,
        }
    }

    /// Ask the client to render a link preview for the first URL in the body.
    pub fn with_preview_url(mut self, preview_url: bool) -> Self {
        self.preview_url = preview_url;
        self
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn preview_url(&self) -> bool {
        self.preview_url
    }

    fn payload(&self) -> Value {
        json!({ "body": self.body, "preview_url": self.preview_url })
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Media
// ═══════════════════════════════════════════════════════════════════════

/// Where the provider fetches media from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Link(String),
    Id(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaMessage {
    to: String,
    kind: MediaKind,
    source: MediaSource,
    caption: Option<String>,
    filename: Option<String>,
    reply_to: Option<String>,
}

impl MediaMessage {
    /// Exactly one of `link` / `media_id` must be given.
    pub fn new(
        kind: MediaKind,
        to: impl Into<String>,
        link: Option<&str>,
        media_id: Option<&str>,
    ) -> D360Result<Self> {
        let source = match (link, media_id) {
            (Some(url), None) => MediaSource::Link(url.to_string()),
            (None, Some(id)) => MediaSource::Id(id.to_string()),
            (None, None) => {
                return Err(D360Error::configuration(
                    "Either media URL or media ID must be provided",
                ))
            }
            (Some(_), Some(_)) => {
                return Err(D360Error::configuration(
                    "Media URL and media ID are mutually exclusive",
                ))
            }
        };
        Ok(Self {
            to: to.into(),
            kind,
            source,
            caption: None,
            filename: None,
            reply_to: None,
        })
    }

    pub fn from_link(kind: MediaKind, to: impl Into<String>, url: impl Into<String>) -> Self {
        Self::from_source(kind, to, MediaSource::Link(url.into()))
    }

    pub fn from_id(kind: MediaKind, to: impl Into<String>, media_id: impl Into<String>) -> Self {
        Self::from_source(kind, to, MediaSource::Id(media_id.into()))
    }

    fn from_source(kind: MediaKind, to: impl Into<String>, source: MediaSource) -> Self {
        Self {
            to: to.into(),
            kind,
            source,
            caption: None,
            filename: None,
            reply_to: None,
        }
    }

    /// Ignored for audio and stickers, which the provider renders without one.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Only rendered for documents.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    fn payload(&self) -> Value {
        let mut payload = match &self.source {
            MediaSource::Link(url) => json!({ "link": url }),
            MediaSource::Id(id) => json!({ "id": id }),
        };
        if self.kind.supports_caption() {
            if let Some(ref caption) = self.caption {
                payload["caption"] = json!(caption);
            }
        }
        if self.kind == MediaKind::Document {
            if let Some(ref filename) = self.filename {
                payload["filename"] = json!(filename);
            }
        }
        payload
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Templates
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMessage {
    to: String,
    name: String,
    language: String,
    components: Vec<TemplateComponent>,
    reply_to: Option<String>,
}

impl TemplateMessage {
    pub fn new(to: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            name: name.into(),
            language: DEFAULT_TEMPLATE_LANGUAGE.to_string(),
            components: Vec::new(),
            reply_to: None,
        }
    }

    pub fn with_language(mut self, code: impl Into<String>) -> Self {
        self.language = code.into();
        self
    }

    pub fn with_component(mut self, component: TemplateComponent) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_components(
        mut self,
        components: impl IntoIterator<Item = TemplateComponent>,
    ) -> Self {
        self.components.extend(components);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn components(&self) -> &[TemplateComponent] {
        &self.components
    }

    fn payload(&self) -> Value {
        let mut payload = json!({
            "name": self.name,
            "language": { "code": self.language },
        });
        if !self.components.is_empty() {
            payload["components"] = json!(self.components);
        }
        payload
    }
}

/// Variable overrides for one template section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateComponent {
    #[serde(rename = "type")]
    pub component_type: TemplateComponentType,
    /// Button components only (`quick_reply`, `url`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    /// Button components only, zero-based. Serialized as a string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<TemplateParameter>,
}

impl TemplateComponent {
    pub fn header(parameters: Vec<TemplateParameter>) -> Self {
        Self {
            component_type: TemplateComponentType::Header,
            sub_type: None,
            index: None,
            parameters,
        }
    }

    pub fn body(parameters: Vec<TemplateParameter>) -> Self {
        Self {
            component_type: TemplateComponentType::Body,
            sub_type: None,
            index: None,
            parameters,
        }
    }

    pub fn button(
        sub_type: impl Into<String>,
        index: u32,
        parameters: Vec<TemplateParameter>,
    ) -> Self {
        Self {
            component_type: TemplateComponentType::Button,
            sub_type: Some(sub_type.into()),
            index: Some(index.to_string()),
            parameters,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemplateComponentType {
    Header,
    Body,
    Button,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateParameter {
    Text { text: String },
    Currency { currency: Currency },
    DateTime { date_time: FallbackValue },
    Image { image: MediaRef },
    Video { video: MediaRef },
    Document { document: MediaRef },
    Payload { payload: String },
}

impl TemplateParameter {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn payload(payload: impl Into<String>) -> Self {
        Self::Payload {
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Currency {
    pub fallback_value: String,
    pub code: String,
    pub amount_1000: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FallbackValue {
    pub fallback_value: String,
}

/// Media reference inside a template header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl MediaRef {
    pub fn link(url: impl Into<String>) -> Self {
        Self {
            link: Some(url.into()),
            id: None,
            filename: None,
        }
    }

    pub fn id(media_id: impl Into<String>) -> Self {
        Self {
            link: None,
            id: Some(media_id.into()),
            filename: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Interactive
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InteractiveKind {
    Button,
    List,
    Product,
    ProductList,
}

impl InteractiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::List => "list",
            Self::Product => "product",
            Self::ProductList => "product_list",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractiveMessage {
    to: String,
    kind: InteractiveKind,
    body: String,
    action: Value,
    header: Option<String>,
    footer: Option<String>,
    reply_to: Option<String>,
}

/// Quick-reply button (max 3 per message, title up to 20 chars).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplyButton {
    pub id: String,
    pub title: String,
}

impl ReplyButton {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub rows: Vec<ListRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductSection {
    pub title: String,
    pub product_items: Vec<ProductItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductItem {
    pub product_retailer_id: String,
}

impl InteractiveMessage {
    /// Escape hatch for action shapes the typed constructors don't cover.
    pub fn new(
        kind: InteractiveKind,
        to: impl Into<String>,
        body: impl Into<String>,
        action: Value,
    ) -> Self {
        Self {
            to: to.into(),
            kind,
            body: body.into(),
            action,
            header: None,
            footer: None,
            reply_to: None,
        }
    }

    pub fn buttons(
        to: impl Into<String>,
        body: impl Into<String>,
        buttons: Vec<ReplyButton>,
    ) -> Self {
        let buttons: Vec<Value> = buttons
            .into_iter()
            .map(|b| json!({ "type": "reply", "reply": b }))
            .collect();
        Self::new(InteractiveKind::Button, to, body, json!({ "buttons": buttons }))
    }

    pub fn list(
        to: impl Into<String>,
        body: impl Into<String>,
        button_label: impl Into<String>,
        sections: Vec<ListSection>,
    ) -> Self {
        let action = json!({ "button": button_label.into(), "sections": sections });
        Self::new(InteractiveKind::List, to, body, action)
    }

    pub fn product(
        to: impl Into<String>,
        body: impl Into<String>,
        catalog_id: impl Into<String>,
        product_retailer_id: impl Into<String>,
    ) -> Self {
        let action = json!({
            "catalog_id": catalog_id.into(),
            "product_retailer_id": product_retailer_id.into(),
        });
        Self::new(InteractiveKind::Product, to, body, action)
    }

    pub fn product_list(
        to: impl Into<String>,
        body: impl Into<String>,
        catalog_id: impl Into<String>,
        sections: Vec<ProductSection>,
    ) -> Self {
        let action = json!({ "catalog_id": catalog_id.into(), "sections": sections });
        Self::new(InteractiveKind::ProductList, to, body, action)
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Plain text header. Product lists require one.
    pub fn with_header_text(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn kind(&self) -> InteractiveKind {
        self.kind
    }

    pub fn action(&self) -> &Value {
        &self.action
    }

    fn payload(&self) -> Value {
        let mut payload = json!({
            "type": self.kind.as_str(),
            "body": { "text": self.body },
            "action": self.action,
        });
        if let Some(ref header) = self.header {
            payload["header"] = json!({ "type": "text", "text": header });
        }
        if let Some(footer) = self.footer.as_deref().filter(|f| !f.is_empty()) {
            payload["footer"] = json!({ "text": footer });
        }
        payload
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Contacts
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct ContactMessage {
    to: String,
    contacts: Vec<ContactCard>,
    reply_to: Option<String>,
}

impl ContactMessage {
    pub fn new(to: impl Into<String>, contacts: Vec<ContactCard>) -> D360Result<Self> {
        if contacts.is_empty() {
            return Err(D360Error::configuration(
                "Contact message needs at least one contact card",
            ));
        }
        Ok(Self {
            to: to.into(),
            contacts,
            reply_to: None,
        })
    }

    pub fn contacts(&self) -> &[ContactCard] {
        &self.contacts
    }

    fn payload(&self) -> Value {
        json!(self.contacts)
    }
}

/// A contact to share.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactCard {
    pub name: ContactName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<ContactPhone>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<ContactEmail>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<ContactUrl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<ContactAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<ContactOrg>,
    /// `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
}

impl ContactCard {
    pub fn new(formatted_name: impl Into<String>) -> Self {
        Self {
            name: ContactName {
                formatted_name: formatted_name.into(),
                first_name: None,
                last_name: None,
            },
            phones: Vec::new(),
            emails: Vec::new(),
            urls: Vec::new(),
            addresses: Vec::new(),
            org: None,
            birthday: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>, phone_type: Option<&str>) -> Self {
        self.phones.push(ContactPhone {
            phone: phone.into(),
            phone_type: phone_type.map(str::to_string),
            wa_id: None,
        });
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.push(ContactEmail {
            email: email.into(),
            email_type: None,
        });
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(ContactUrl {
            url: url.into(),
            url_type: None,
        });
        self
    }

    pub fn with_address(mut self, address: ContactAddress) -> Self {
        self.addresses.push(address);
        self
    }

    pub fn with_org(mut self, org: ContactOrg) -> Self {
        self.org = Some(org);
        self
    }

    pub fn with_birthday(mut self, birthday: impl Into<String>) -> Self {
        self.birthday = Some(birthday.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactName {
    pub formatted_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactPhone {
    pub phone: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub phone_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wa_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactEmail {
    pub email: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub email_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactUrl {
    pub url: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub url_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactOrg {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::D360ErrorCode;

    #[test]
    fn test_text_request_body() {
        let msg: Message = TextMessage::new("1234567890", "Hello").into();
        let body = msg.to_request_body();
        assert_eq!(
            body,
            json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "1234567890",
                "type": "text",
                "text": { "body": "Hello", "preview_url": false }
            })
        );
    }

    #[test]
    fn test_reply_context() {
        let msg = Message::from(TextMessage::new("1", "ok").with_preview_url(true))
            .in_reply_to("wamid.prev");
        let body = msg.to_request_body();
        assert_eq!(body["context"]["message_id"], "wamid.prev");
        assert_eq!(body["text"]["preview_url"], true);
        assert_eq!(msg.reply_to(), Some("wamid.prev"));
    }

    #[test]
    fn test_media_requires_exactly_one_source() {
        let err = MediaMessage::new(MediaKind::Image, "1", None, None).unwrap_err();
        assert_eq!(err.code, D360ErrorCode::Configuration);
        let err = MediaMessage::new(MediaKind::Image, "1", Some("https://x/a.jpg"), Some("42"))
            .unwrap_err();
        assert_eq!(err.code, D360ErrorCode::Configuration);
        assert!(MediaMessage::new(MediaKind::Image, "1", None, Some("42")).is_ok());
    }

    #[test]
    fn test_media_payload_by_kind() {
        let doc: Message = MediaMessage::from_link(MediaKind::Document, "1", "https://x/r.pdf")
            .with_caption("Report")
            .with_filename("r.pdf")
            .into();
        let body = doc.to_request_body();
        assert_eq!(body["type"], "document");
        assert_eq!(body["document"]["link"], "https://x/r.pdf");
        assert_eq!(body["document"]["caption"], "Report");
        assert_eq!(body["document"]["filename"], "r.pdf");

        let audio: Message = MediaMessage::from_id(MediaKind::Audio, "1", "media-9")
            .with_caption("ignored")
            .with_filename("ignored.ogg")
            .into();
        assert_eq!(audio.payload(), json!({ "id": "media-9" }));

        let image: Message = MediaMessage::from_id(MediaKind::Image, "1", "m")
            .with_filename("x.png")
            .into();
        assert!(image.payload().get("filename").is_none());
    }

    #[test]
    fn test_template_without_components() {
        let msg: Message = TemplateMessage::new("1", "hello_world").into();
        let payload = msg.payload();
        assert_eq!(payload["name"], "hello_world");
        assert_eq!(payload["language"]["code"], "en_US");
        assert!(payload.get("components").is_none());
    }

    #[test]
    fn test_template_components() {
        let msg: Message = TemplateMessage::new("1", "order_update")
            .with_language("de")
            .with_component(TemplateComponent::header(vec![TemplateParameter::Image {
                image: MediaRef::link("https://x/banner.png"),
            }]))
            .with_component(TemplateComponent::body(vec![
                TemplateParameter::text("Ada"),
                TemplateParameter::Currency {
                    currency: Currency {
                        fallback_value: "$10.99".into(),
                        code: "USD".into(),
                        amount_1000: 10990,
                    },
                },
            ]))
            .with_component(TemplateComponent::button(
                "quick_reply",
                0,
                vec![TemplateParameter::payload("TRACK")],
            ))
            .into();
        let payload = msg.payload();
        let components = payload["components"].as_array().unwrap();
        assert_eq!(components.len(), 3);
        assert_eq!(components[0]["type"], "header");
        assert_eq!(components[0]["parameters"][0]["type"], "image");
        assert_eq!(
            components[0]["parameters"][0]["image"]["link"],
            "https://x/banner.png"
        );
        assert_eq!(components[1]["parameters"][0], json!({"type":"text","text":"Ada"}));
        assert_eq!(components[1]["parameters"][1]["currency"]["amount_1000"], 10990);
        assert_eq!(components[2]["sub_type"], "quick_reply");
        assert_eq!(components[2]["index"], "0");
        assert_eq!(components[2]["parameters"][0]["payload"], "TRACK");
        assert_eq!(payload["language"]["code"], "de");
    }

    #[test]
    fn test_interactive_buttons() {
        let msg: Message = InteractiveMessage::buttons(
            "1",
            "Pick one",
            vec![ReplyButton::new("yes", "Yes"), ReplyButton::new("no", "No")],
        )
        .into();
        let body = msg.to_request_body();
        assert_eq!(body["type"], "interactive");
        let interactive = &body["interactive"];
        assert_eq!(interactive["type"], "button");
        assert_eq!(interactive["body"]["text"], "Pick one");
        assert_eq!(interactive["action"]["buttons"][1]["type"], "reply");
        assert_eq!(interactive["action"]["buttons"][1]["reply"]["id"], "no");
        assert!(interactive.get("footer").is_none());
        assert!(interactive.get("header").is_none());
    }

    #[test]
    fn test_interactive_footer_only_when_non_empty() {
        let empty: Message = InteractiveMessage::product("1", "Look", "cat-1", "sku-1")
            .with_footer("")
            .into();
        assert!(empty.payload().get("footer").is_none());

        let set: Message = InteractiveMessage::list(
            "1",
            "Menu",
            "Open",
            vec![ListSection {
                title: Some("Mains".into()),
                rows: vec![ListRow {
                    id: "r1".into(),
                    title: "Soup".into(),
                    description: None,
                }],
            }],
        )
        .with_footer("Thanks")
        .with_header_text("Today")
        .into();
        let payload = set.payload();
        assert_eq!(payload["type"], "list");
        assert_eq!(payload["footer"]["text"], "Thanks");
        assert_eq!(payload["header"], json!({"type":"text","text":"Today"}));
        assert_eq!(payload["action"]["button"], "Open");
        assert_eq!(payload["action"]["sections"][0]["rows"][0]["id"], "r1");
    }

    #[test]
    fn test_product_list_action() {
        let msg = InteractiveMessage::product_list(
            "1",
            "Catalog",
            "cat-9",
            vec![ProductSection {
                title: "Shoes".into(),
                product_items: vec![ProductItem {
                    product_retailer_id: "sku-2".into(),
                }],
            }],
        );
        assert_eq!(msg.kind(), InteractiveKind::ProductList);
        assert_eq!(msg.action()["catalog_id"], "cat-9");
        assert_eq!(
            msg.action()["sections"][0]["product_items"][0]["product_retailer_id"],
            "sku-2"
        );
    }

    #[test]
    fn test_contact_message() {
        let card = ContactCard::new("Ada Lovelace")
            .with_phone("+441234", Some("WORK"))
            .with_email("ada@example.com")
            .with_org(ContactOrg {
                company: Some("Analytical".into()),
                ..Default::default()
            });
        let msg: Message = ContactMessage::new("1", vec![card]).unwrap().into();
        let body = msg.to_request_body();
        assert_eq!(body["type"], "contacts");
        let cards = body["contacts"].as_array().unwrap();
        assert_eq!(cards[0]["name"]["formatted_name"], "Ada Lovelace");
        assert_eq!(cards[0]["phones"][0]["type"], "WORK");
        assert_eq!(cards[0]["org"]["company"], "Analytical");
        assert!(cards[0].get("urls").is_none());
    }

    #[test]
    fn test_contact_message_requires_card() {
        let err = ContactMessage::new("1", vec![]).unwrap_err();
        assert_eq!(err.code, D360ErrorCode::Configuration);
    }
}
