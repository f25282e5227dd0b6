//! Document-extraction collaborator seam and its parse-API adapter.
//!
//! Document-like, image, and plain-text uploads are handed to a remote parse
//! backend that performs chunking and per-chunk enrichment server-side. The
//! pipeline consumes the uniform [`ProcessingResult`] record; transport-level
//! failures never escape the adapter as errors, they become failed results.

use crate::config::ProcessingConfig;
use crate::pipeline::{DocumentInfo, ProcessingResult, StatusReporter, UploadedFile};
use crate::retry::{CallFailure, guard_rate_limited};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised by the parse backend before classification.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Parse endpoint was unreachable or missing.
    #[error("Parse endpoint unavailable: {0}")]
    Unavailable(String),
    /// The backend rejected the call due to rate limiting.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
    /// The backend returned an error response.
    #[error("Parse request failed: {0}")]
    Failed(String),
    /// The backend response could not be parsed.
    #[error("Malformed parse response: {0}")]
    InvalidResponse(String),
}

impl CallFailure for ExtractError {
    fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited(_))
            || self.to_string().to_lowercase().contains("rate limit")
    }
}

/// Turns raw file bytes into enriched, ordered chunks.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Extract `file` into chunks with per-chunk metadata.
    ///
    /// Always returns the uniform [`ProcessingResult`] contract: a failed
    /// result instead of an error, so the per-file state machine decides what
    /// a failure means for the file.
    async fn extract(
        &self,
        file: &UploadedFile,
        config: &ProcessingConfig,
        concurrency_limit: usize,
        status: Option<&dyn StatusReporter>,
    ) -> ProcessingResult;
}

/// Chunk record returned by the parse backend.
#[derive(Debug, Deserialize)]
struct ParsedChunk {
    index: usize,
    text: String,
    title: String,
    #[serde(default)]
    hashtags: Vec<String>,
    #[serde(default)]
    hypothetical_questions: Vec<String>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    chunks: Vec<ParsedChunk>,
}

/// Adapter for the remote parse API.
///
/// Each call is wrapped in the rate-limited guard, so transient failures are
/// retried and the final failure is classified before being folded into the
/// result record.
pub struct ParseApiExtractor {
    http: Client,
}

impl ParseApiExtractor {
    /// Construct the adapter with a long-lived HTTP client.
    pub fn new() -> Self {
        let http = Client::builder()
            .user_agent("docsift/extract")
            .build()
            .expect("Failed to construct reqwest::Client for extraction");
        Self { http }
    }

    async fn request_parse(
        &self,
        file: &UploadedFile,
        config: &ProcessingConfig,
        concurrency_limit: usize,
    ) -> Result<Vec<DocumentInfo>, ExtractError> {
        let endpoint = format!(
            "{}/v1/parse",
            config.parse_api_url.trim_end_matches('/')
        );
        let mut request = self
            .http
            .post(&endpoint)
            .query(&[
                ("filename", file.name.as_str()),
                ("method", config.processing_method.as_str()),
            ])
            .query(&[("concurrency", concurrency_limit)])
            .header("content-type", "application/octet-stream")
            .body(file.bytes.clone());
        if let Some(api_key) = &config.api_key
            && !api_key.is_empty()
        {
            request = request.header("api-key", api_key);
        }

        let response = request.send().await.map_err(|error| {
            ExtractError::Unavailable(format!(
                "failed to reach parse backend at {}: {error}",
                config.parse_api_url
            ))
        })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                let body = response.text().await.unwrap_or_default();
                return Err(ExtractError::RateLimited(format!(
                    "parse backend rate limit: {body}"
                )));
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(ExtractError::Failed(format!(
                    "parse backend returned {status}: {body}"
                )));
            }
            _ => {}
        }

        let payload: ParseResponse = response.json().await.map_err(|error| {
            ExtractError::InvalidResponse(format!("failed to decode parse response: {error}"))
        })?;

        if payload.chunks.is_empty() {
            return Err(ExtractError::InvalidResponse(format!(
                "parse backend returned no chunks for '{}'",
                file.name
            )));
        }

        Ok(payload
            .chunks
            .into_iter()
            .map(|chunk| DocumentInfo {
                source_name: file.name.clone(),
                index: chunk.index,
                text_chunk: chunk.text,
                title: chunk.title,
                hashtags: chunk.hashtags,
                hypothetical_questions: chunk.hypothetical_questions,
                summary: chunk.summary,
                metadata: chunk.metadata,
            })
            .collect())
    }
}

impl Default for ParseApiExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentExtractor for ParseApiExtractor {
    async fn extract(
        &self,
        file: &UploadedFile,
        config: &ProcessingConfig,
        concurrency_limit: usize,
        _status: Option<&dyn StatusReporter>,
    ) -> ProcessingResult {
        let outcome =
            guard_rate_limited(|| self.request_parse(file, config, concurrency_limit)).await;

        match outcome {
            Ok(document_info) => ProcessingResult::completed(
                format!(
                    "Parsed {} chunks from {}",
                    document_info.len(),
                    file.name
                ),
                config.processing_method,
                document_info,
            ),
            Err(error) => {
                tracing::error!(file = %file.name, error = %error, "Document extraction failed");
                ProcessingResult::failed(
                    format!("Error processing document: {error}"),
                    config.processing_method,
                    error.to_string(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingMethod;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    fn config_for(server: &MockServer) -> ProcessingConfig {
        ProcessingConfig {
            api_key: None,
            parse_api_url: server.base_url(),
            agent_url: server.base_url(),
            store_url: server.base_url(),
            embedding_model: "text-embedding-3-small".into(),
            processing_method: ProcessingMethod::ParseApi,
            session_id: "session-7".into(),
        }
    }

    #[tokio::test]
    async fn extract_maps_parse_response_into_document_info() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/parse")
                    .query_param("filename", "notes.pdf")
                    .query_param("method", "parse-api");
                then.status(200).json_body(json!({
                    "chunks": [
                        {
                            "index": 0,
                            "text": "First page text",
                            "title": "Intro",
                            "hashtags": ["#notes"],
                            "hypothetical_questions": ["What is this?"],
                            "summary": "The introduction."
                        }
                    ]
                }));
            })
            .await;

        let extractor = ParseApiExtractor::new();
        let file = UploadedFile::new("notes.pdf", b"%PDF-".to_vec());
        let result = extractor
            .extract(&file, &config_for(&server), 5, None)
            .await;

        mock.assert();
        assert!(result.success);
        let docs = result.document_info.expect("chunks");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_name, "notes.pdf");
        assert_eq!(docs[0].title, "Intro");
        assert!(result.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn extract_retries_and_reports_failure_as_result() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/parse");
                then.status(500).body("parser crashed");
            })
            .await;

        let extractor = ParseApiExtractor::new();
        let file = UploadedFile::new("notes.pdf", b"%PDF-".to_vec());
        let result = extractor
            .extract(&file, &config_for(&server), 5, None)
            .await;

        // Guard makes three attempts before giving up.
        assert_eq!(mock.hits_async().await, 3);
        assert!(!result.success);
        assert!(result.document_info.is_none());
        assert!(result.error.expect("error").contains("500"));
    }

    #[tokio::test(start_paused = true)]
    async fn extract_classifies_rate_limit_responses() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/parse");
                then.status(429).body("quota exhausted");
            })
            .await;

        let extractor = ParseApiExtractor::new();
        let file = UploadedFile::new("scan.png", vec![0x89, 0x50]);
        let result = extractor
            .extract(&file, &config_for(&server), 3, None)
            .await;

        assert!(!result.success);
        let error = result.error.expect("error");
        assert!(error.to_lowercase().contains("rate limit"));
    }

    #[tokio::test(start_paused = true)]
    async fn extract_rejects_empty_chunk_lists() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/parse");
                then.status(200).json_body(json!({ "chunks": [] }));
            })
            .await;

        let extractor = ParseApiExtractor::new();
        let file = UploadedFile::new("empty.txt", Vec::new());
        let result = extractor
            .extract(&file, &config_for(&server), 5, None)
            .await;

        assert!(!result.success);
        assert!(result.error.expect("error").contains("no chunks"));
    }
}
