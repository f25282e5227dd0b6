//! HTTP client wrapper for the unified-store sink.

use crate::config::ProcessingConfig;
use crate::store::types::{StoreError, UnifiedChunk};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::json;

/// Sink that indexes enriched chunks for later retrieval.
///
/// The pipeline treats the sink as safe for concurrent writes; all ingests for
/// one file run concurrently. Idempotency on re-ingest is the sink's concern,
/// not the pipeline's; the pipeline does not retry ingestion today.
#[async_trait]
pub trait UnifiedStore: Send + Sync {
    /// Hand one enriched chunk to the store.
    async fn ingest(
        &self,
        chunk: UnifiedChunk,
        config: &ProcessingConfig,
    ) -> Result<(), StoreError>;
}

/// Lightweight HTTP client for unified-store operations.
pub struct HttpUnifiedStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpUnifiedStore {
    /// Construct a new client for the store at `base_url`.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent("docsift/0.3")
            .build()
            .map_err(StoreError::Http)?;

        let base_url = normalize_base_url(base_url).map_err(StoreError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = api_key.as_deref().map(|value| !value.is_empty()).unwrap_or(false),
            "Initialized unified-store HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Unified-store request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl UnifiedStore for HttpUnifiedStore {
    async fn ingest(
        &self,
        chunk: UnifiedChunk,
        config: &ProcessingConfig,
    ) -> Result<(), StoreError> {
        let source = chunk.source_name.clone();
        let index = chunk.index;
        let body = json!({
            "document": chunk,
            "session_id": config.session_id,
            "embedding_model": config.embedding_model,
        });

        let response = self
            .request(Method::POST, "v1/documents")
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(source = %source, index, "Chunk ingested");
        })
        .await
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
