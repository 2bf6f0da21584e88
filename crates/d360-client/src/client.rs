//! 360dialog API client.
//!
//! One method per provider operation. Every call goes through the same
//! [`RetryPolicy`], so transient network failures are retried uniformly and
//! any HTTP response is handed straight to the normalizer.

use crate::config::ClientConfig;
use crate::error::{D360Error, D360Result};
use crate::media::validate_media;
use crate::messages::{Message, MESSAGING_PRODUCT};
use crate::response::{
    HealthStatus, MediaDescriptor, SendResult, TemplateList, WabaWebhookConfig,
    WabaWebhookUpdate, WebhookConfig,
};
use crate::retry::RetryPolicy;
use crate::transport::{
    ApiRequest, ApiResponse, HttpTransport, MultipartUpload, RequestBody, ReqwestTransport,
};
use bytes::Bytes;
use log::{debug, info};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Filters for [`Dialog360Client::list_templates`].
#[derive(Debug, Clone, Default)]
pub struct TemplateQuery {
    /// JSON filter object, e.g. `{"business_templates.status": "approved"}`.
    pub filters: Option<Value>,
    /// Sort key, prefix with `-` for descending.
    pub sort: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Client for the 360dialog WhatsApp Business API.
#[derive(Clone)]
pub struct Dialog360Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn HttpTransport>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for Dialog360Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dialog360Client")
            .field("base_url", &self.config.base_url)
            .field("api_generation", &self.config.api_generation)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Dialog360Client {
    /// Validate `config` and connect through `reqwest`.
    pub fn new(config: ClientConfig) -> D360Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::assemble(config, Arc::new(transport)))
    }

    /// Validate `config` and use a caller-supplied transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> D360Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, transport))
    }

    fn assemble(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let retry = RetryPolicy::new(config.max_retries, config.backoff());
        Self {
            config: Arc::new(config),
            transport,
            retry,
        }
    }

    /// Replace the retry policy derived from the config.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    // ─── Core request helpers ────────────────────────────────────────

    async fn execute(&self, request: ApiRequest) -> D360Result<ApiResponse> {
        self.retry.execute(self.transport.as_ref(), &request).await
    }

    /// Like [`Self::execute`] but non-2xx becomes an `Api` error.
    async fn execute_ok(&self, request: ApiRequest) -> D360Result<ApiResponse> {
        let resp = self.execute(request).await?;
        if resp.is_success() {
            Ok(resp)
        } else {
            Err(D360Error::from_api_response(resp.status, &resp.text()))
        }
    }

    async fn get_json(&self, path: &str) -> D360Result<Value> {
        Ok(self.execute_ok(ApiRequest::get(path)).await?.json_or_text())
    }

    // ─── Messages ────────────────────────────────────────────────────

    /// Send a message. Provider rejections come back as a failed
    /// [`SendResult`]; only network exhaustion and local faults are errors.
    pub async fn send_message(&self, message: &Message) -> D360Result<SendResult> {
        let path = self.config.api_generation.messages_path();
        debug!("Sending {} message to {}", message.type_tag(), message.to());

        let resp = self
            .execute(ApiRequest::post_json(path, message.to_request_body()))
            .await?;
        let result = SendResult::from_response(&resp, self.config.api_generation);
        if result.success {
            info!(
                "Sent {} message {}",
                message.type_tag(),
                result.message_id.as_deref().unwrap_or_default()
            );
        } else {
            info!(
                "Provider rejected {} message to {} (HTTP {}): {}",
                message.type_tag(),
                message.to(),
                resp.status,
                result.error_message.as_deref().unwrap_or("no error message")
            );
        }
        Ok(result)
    }

    // ─── Media ───────────────────────────────────────────────────────

    /// Upload raw bytes and return the new media id. Size and MIME are
    /// checked before anything is sent.
    pub async fn upload_media(
        &self,
        data: impl Into<Bytes>,
        filename: &str,
        mime_type: &str,
    ) -> D360Result<String> {
        let data: Bytes = data.into();
        validate_media(data.len() as u64, mime_type)?;

        let upload = MultipartUpload {
            fields: vec![("messaging_product".to_string(), MESSAGING_PRODUCT.to_string())],
            file_field: "file".to_string(),
            file_name: filename.to_string(),
            mime_type: mime_type.to_string(),
            data,
        };
        let request = ApiRequest::new(reqwest::Method::POST, "/media")
            .with_body(RequestBody::Multipart(upload));
        let body = self.execute_ok(request).await?.json_or_text();

        let id = body["id"]
            .as_str()
            .ok_or_else(|| D360Error::internal("No media id in upload response"))?
            .to_string();
        info!("Uploaded media {} ({})", id, filename);
        Ok(id)
    }

    /// Upload a local file. The size check runs on file metadata, before the
    /// file is read.
    pub async fn upload_media_file(
        &self,
        path: impl AsRef<Path>,
        mime_type: &str,
    ) -> D360Result<String> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| D360Error::io(format!("{}: {}", path.display(), e)))?;
        validate_media(meta.len(), mime_type)?;

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| D360Error::io(format!("Read file error: {}", e)))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        self.upload_media(data, filename, mime_type).await
    }

    /// Metadata and short-lived download URL for a media id.
    pub async fn get_media(&self, media_id: &str) -> D360Result<MediaDescriptor> {
        let path = media_path(media_id)?;
        let body = self.get_json(&path).await?;
        Ok(MediaDescriptor::from_value(body))
    }

    /// Fetch a provider media URL through the gateway. The URL's path and
    /// query are re-rooted onto the configured base URL so the API key
    /// header applies.
    pub async fn download_url(&self, download_url: &str) -> D360Result<Bytes> {
        let path = reroot_path(download_url)?;
        debug!("Downloading {}", path);
        Ok(self.execute_ok(ApiRequest::get(path)).await?.body)
    }

    /// Download a media object's bytes.
    pub async fn download_media(&self, media_id: &str) -> D360Result<(Bytes, MediaDescriptor)> {
        let descriptor = self.get_media(media_id).await?;
        if descriptor.url.is_empty() {
            return Err(D360Error::internal(format!(
                "No download URL for media {}",
                media_id
            )));
        }
        let bytes = self.download_url(&descriptor.url).await?;
        info!("Downloaded {} bytes for media {}", bytes.len(), media_id);
        Ok((bytes, descriptor))
    }

    /// Download a media object and write it to `path`.
    pub async fn download_media_to(
        &self,
        media_id: &str,
        path: impl AsRef<Path>,
    ) -> D360Result<MediaDescriptor> {
        let path = path.as_ref();
        let (bytes, descriptor) = self.download_media(media_id).await?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| D360Error::io(format!("Write file error: {}", e)))?;
        info!("Saved media {} to {}", media_id, path.display());
        Ok(descriptor)
    }

    /// `true` iff the provider answered 200. A 404 means the media is
    /// already gone and yields `false`.
    pub async fn delete_media(&self, media_id: &str) -> D360Result<bool> {
        let path = media_path(media_id)?;
        let resp = self.execute(ApiRequest::delete(path)).await?;
        match resp.status {
            200 => {
                info!("Deleted media {}", media_id);
                Ok(true)
            }
            404 => Ok(false),
            s if (200..300).contains(&s) => Ok(false),
            s => Err(D360Error::from_api_response(s, &resp.text())),
        }
    }

    // ─── Webhook configuration ───────────────────────────────────────

    pub async fn get_webhook_url(&self) -> D360Result<WebhookConfig> {
        let body = self.get_json("/v1/configs/webhook").await?;
        Ok(WebhookConfig::from_value(body))
    }

    pub async fn set_webhook_url(&self, url: &str) -> D360Result<WebhookConfig> {
        check_webhook_url(url)?;
        let resp = self
            .execute_ok(ApiRequest::post_json(
                "/v1/configs/webhook",
                json!({ "url": url }),
            ))
            .await?;
        info!("Phone number webhook set to {}", url);
        Ok(WebhookConfig::from_value(resp.json_or_text()))
    }

    pub async fn get_waba_webhook(&self) -> D360Result<WabaWebhookConfig> {
        let body = self.get_json("/waba_webhook").await?;
        Ok(WabaWebhookConfig::from_value(body))
    }

    /// Set the account-level webhook. `override_all` also replaces the
    /// webhook of every phone number under the account.
    pub async fn set_waba_webhook(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        override_all: bool,
    ) -> D360Result<WabaWebhookUpdate> {
        check_webhook_url(url)?;
        let mut payload = json!({ "url": url, "override_all": override_all });
        if !headers.is_empty() {
            payload["headers"] = json!(headers);
        }
        let resp = self
            .execute_ok(ApiRequest::post_json("/waba_webhook", payload))
            .await?;
        info!("Account webhook set to {} (override_all={})", url, override_all);
        Ok(WabaWebhookUpdate::from_value(resp.json_or_text()))
    }

    // ─── Account ─────────────────────────────────────────────────────

    pub async fn health_status(&self) -> D360Result<HealthStatus> {
        let body = self.get_json("/health_status").await?;
        Ok(HealthStatus::from_value(body))
    }

    pub async fn list_templates(&self, query: &TemplateQuery) -> D360Result<TemplateList> {
        let mut request = ApiRequest::get("/v1/configs/templates");
        if let Some(ref filters) = query.filters {
            request = request.with_query("filters", filters.to_string());
        }
        if let Some(ref sort) = query.sort {
            request = request.with_query("sort", sort.clone());
        }
        if let Some(limit) = query.limit {
            request = request.with_query("limit", limit.to_string());
        }
        if let Some(offset) = query.offset {
            request = request.with_query("offset", offset.to_string());
        }
        let body = self.execute_ok(request).await?.json_or_text();
        Ok(TemplateList::from_value(body))
    }
}

/// `https://lookaside.fbsbx.com/a/b?x=1` → `/a/b?x=1`.
fn reroot_path(download_url: &str) -> D360Result<String> {
    let parsed = url::Url::parse(download_url)
        .map_err(|e| D360Error::validation(format!("Invalid media download URL: {}", e)))?;
    Ok(match parsed.query() {
        Some(q) => format!("{}?{}", parsed.path(), q),
        None => parsed.path().to_string(),
    })
}

/// `/{media_id}`, refusing ids that would address another endpoint.
fn media_path(media_id: &str) -> D360Result<String> {
    let id = media_id.trim();
    if id.is_empty() {
        return Err(D360Error::configuration("Media id must not be empty"));
    }
    if id.contains(['/', '?', '#', '\\']) || id == "." || id == ".." {
        return Err(D360Error::configuration(format!(
            "Invalid media id: {}",
            media_id
        )));
    }
    Ok(format!("/{}", id))
}

fn check_webhook_url(url: &str) -> D360Result<()> {
    let parsed = url::Url::parse(url)
        .map_err(|e| D360Error::validation(format!("Invalid webhook URL {}: {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(D360Error::validation(format!(
            "Webhook URL must be http(s): {}",
            url
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::D360ErrorCode;

    #[test]
    fn test_media_path() {
        assert_eq!(media_path("1037543291543636").unwrap(), "/1037543291543636");
        assert_eq!(media_path(" 42 ").unwrap(), "/42");
        for bad in ["", "  ", "..", "../waba_webhook", "x?y=1", "a#b", "a\\b"] {
            let err = media_path(bad).unwrap_err();
            assert_eq!(err.code, D360ErrorCode::Configuration, "{:?}", bad);
        }
    }

    #[test]
    fn test_reroot_path() {
        assert_eq!(
            reroot_path(
                "https://lookaside.fbsbx.com/whatsapp_business/attachments/?mid=13&ext=16&hash=ATt"
            )
            .unwrap(),
            "/whatsapp_business/attachments/?mid=13&ext=16&hash=ATt"
        );
        assert_eq!(reroot_path("https://cdn.example/file.jpg").unwrap(), "/file.jpg");
        assert!(reroot_path("not a url").is_err());
    }

    #[test]
    fn test_check_webhook_url() {
        assert!(check_webhook_url("https://hook.example/wa").is_ok());
        assert!(check_webhook_url("mailto:ops@example.com").is_err());
        assert!(check_webhook_url("").is_err());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(Dialog360Client::new(ClientConfig::new("", "1")).is_err());
        let client =
            Dialog360Client::new(ClientConfig::new("key", "1").with_max_retries(5)).unwrap();
        assert_eq!(client.retry_policy().max_attempts, 5);
    }
}
