mod common;

use async_trait::async_trait;
use common::*;
use d360_client::webhooks::{InboundMessage, NoopHandler};
use d360_client::{
    D360Result, Dialog360Client, Message, TextMessage, WebhookHandler, WebhookReceiver,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn text_event(from: &str, id: &str, body: &str) -> String {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {
                        "display_phone_number": "4930609859535",
                        "phone_number_id": "106540352242922"
                    },
                    "contacts": [{"profile": {"name": "Kerry"}, "wa_id": from}],
                    "messages": [{
                        "from": from,
                        "id": id,
                        "timestamp": "1749416383",
                        "type": "text",
                        "text": {"body": body}
                    }]
                }
            }]
        }]
    })
    .to_string()
}

/// Answers greetings through the client, quoting the inbound message.
struct Greeter {
    client: Dialog360Client,
}

#[async_trait]
impl WebhookHandler for Greeter {
    async fn on_text(&self, message: &InboundMessage, body: &str) -> D360Result<()> {
        let lower = body.to_lowercase();
        if lower.contains("hello") || lower.contains("hi") {
            let text = TextMessage::new(&message.from, "Hello! Thanks for your message.");
            let reply = Message::from(text).in_reply_to(&message.id);
            self.client.send_message(&reply).await?;
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_verification_challenge() {
    let receiver = WebhookReceiver::new("my-token", Arc::new(NoopHandler));

    let ok = receiver
        .handle(
            "GET",
            &query(&[
                ("hub_mode", "subscribe"),
                ("hub_verify_token", "my-token"),
                ("hub_challenge", "abc123"),
            ]),
            b"",
        )
        .await;
    assert_eq!(ok.status, 200);
    assert_eq!(ok.body, "abc123");

    let denied = receiver
        .handle(
            "GET",
            &query(&[
                ("hub_mode", "subscribe"),
                ("hub_verify_token", "other"),
                ("hub_challenge", "abc123"),
            ]),
            b"",
        )
        .await;
    assert_eq!(denied.status, 403);
    assert!(!denied.body.contains("abc123"));

    let wrong_mode = receiver.verify(&query(&[
        ("hub_mode", "unsubscribe"),
        ("hub_verify_token", "my-token"),
        ("hub_challenge", "abc123"),
    ]));
    assert_eq!(wrong_mode.status, 403);
}

#[tokio::test]
async fn test_post_replies_to_greeting() {
    let (client, transport) =
        client_with(vec![ok_json(json!({"messages": [{"id": "wamid.REPLY"}]}))]);
    let receiver = WebhookReceiver::new("t", Arc::new(Greeter { client }));

    let reply = receiver
        .handle(
            "POST",
            &HashMap::new(),
            text_event("16505551234", "wamid.IN", "Hi there").as_bytes(),
        )
        .await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, "application/json");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    match &requests[0].body {
        d360_client::transport::RequestBody::Json(body) => {
            assert_eq!(body["to"], "16505551234");
            assert_eq!(body["context"]["message_id"], "wamid.IN");
        }
        other => panic!("expected JSON body, got {:?}", other),
    }
}

#[tokio::test]
async fn test_post_without_greeting_sends_nothing() {
    let (client, transport) = client_with(vec![]);
    let receiver = WebhookReceiver::new("t", Arc::new(Greeter { client }));
    let reply = receiver
        .receive(text_event("1", "wamid.Q", "What are your opening times?").as_bytes())
        .await;
    assert_eq!(reply.status, 200);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_post_handler_failure_is_500() {
    // Every attempt fails, so the greeter's send errors out.
    let (client, _) = client_with(vec![network("down"), network("down"), network("down")]);
    let receiver = WebhookReceiver::new("t", Arc::new(Greeter { client }));
    let reply = receiver
        .receive(text_event("1", "wamid.H", "hello").as_bytes())
        .await;
    assert_eq!(reply.status, 500);
}

#[tokio::test]
async fn test_bad_body_and_method() {
    let receiver = WebhookReceiver::new("t", Arc::new(NoopHandler));
    assert_eq!(receiver.handle("POST", &HashMap::new(), b"<xml/>").await.status, 400);
    assert_eq!(receiver.handle("DELETE", &HashMap::new(), b"").await.status, 405);

    // Valid JSON without an envelope is acknowledged.
    let reply = receiver.handle("POST", &HashMap::new(), b"{}").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, r#"{"status":"ok"}"#);
}
