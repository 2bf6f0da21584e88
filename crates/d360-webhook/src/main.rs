//! Standalone webhook endpoint for a 360dialog number.
//!
//! Environment:
//! - `D360_API_KEY`, `D360_PHONE_NUMBER_ID` and the other `D360_*` client
//!   settings (see `ClientConfig::from_env`)
//! - `WEBHOOK_VERIFY_TOKEN` – token expected in the verification challenge
//! - `WEBHOOK_BIND` – listen address, default `0.0.0.0:8080`
//! - `RUST_LOG` – log filter

mod auto_reply;

use auto_reply::AutoReply;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use d360_client::{ClientConfig, D360Error, Dialog360Client, WebhookReceiver};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BIND: &str = "0.0.0.0:8080";

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,d360_client=debug,d360_webhook=debug".into());

    #[cfg(feature = "logs-json")]
    let fmt = tracing_subscriber::fmt::layer().json();
    #[cfg(not(feature = "logs-json"))]
    let fmt = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry().with(filter).with(fmt).init();
}

fn app(receiver: Arc<WebhookReceiver>) -> Router {
    Router::new()
        .route("/webhook", any(webhook))
        .with_state(receiver)
}

async fn webhook(
    State(receiver): State<Arc<WebhookReceiver>>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let reply = receiver.handle(method.as_str(), &query, &body).await;
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, reply.content_type)], reply.body).into_response()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging();

    let config = ClientConfig::from_env()?;
    let verify_token = std::env::var("WEBHOOK_VERIFY_TOKEN")
        .ok()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| D360Error::configuration("WEBHOOK_VERIFY_TOKEN must be set"))?;
    let bind = std::env::var("WEBHOOK_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());

    let client = Dialog360Client::new(config)?;
    let receiver = Arc::new(WebhookReceiver::new(
        verify_token,
        Arc::new(AutoReply::new(client)),
    ));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Webhook listening on http://{}/webhook", bind);
    axum::serve(listener, app(receiver)).await?;
    Ok(())
}
