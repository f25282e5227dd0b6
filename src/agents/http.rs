//! HTTP adapter for the remote metadata/summary agent service.

use super::{AgentError, ChunkMetadataAgent, DocumentSummaryAgent};
use crate::pipeline::{AgentMetadata, DocumentSummaryMetadata};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;

/// Client for an agent service exposing per-chunk metadata and document
/// summary endpoints.
///
/// Mirrors the other collaborator adapters: one long-lived `reqwest` client,
/// explicit status-code triage, and typed errors. Both agent traits are
/// implemented on the same client because the remote service hosts both
/// models.
pub struct HttpAgentClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpAgentClient {
    /// Construct a client for the agent service at `base_url`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let http = Client::builder()
            .user_agent("docsift/agents")
            .build()
            .expect("Failed to construct reqwest::Client for agent calls");
        Self {
            http,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    async fn post_json(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<reqwest::Response, AgentError> {
        let mut request = self.http.post(self.endpoint(path)).json(&payload);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            request = request.header("api-key", api_key);
        }

        let response = request.send().await.map_err(|error| {
            AgentError::Unavailable(format!(
                "failed to reach agent service at {}: {error}",
                self.base_url
            ))
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(AgentError::Unavailable(format!(
                "agent endpoint {} returned 404",
                self.endpoint(path)
            ))),
            StatusCode::TOO_MANY_REQUESTS => {
                let body = response.text().await.unwrap_or_default();
                Err(AgentError::RateLimited(format!(
                    "agent service rate limit: {body}"
                )))
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(AgentError::GenerationFailed(format!(
                    "agent service returned {status}: {body}"
                )))
            }
            _ => Ok(response),
        }
    }
}

#[async_trait]
impl ChunkMetadataAgent for HttpAgentClient {
    async fn generate(&self, text: &str) -> Result<AgentMetadata, AgentError> {
        let response = self
            .post_json("v1/metadata", json!({ "content": text }))
            .await?;

        response.json::<AgentMetadata>().await.map_err(|error| {
            AgentError::InvalidResponse(format!("failed to decode metadata response: {error}"))
        })
    }
}

#[async_trait]
impl DocumentSummaryAgent for HttpAgentClient {
    async fn summarize(
        &self,
        chunks: &[String],
        file_name: &str,
    ) -> Result<DocumentSummaryMetadata, AgentError> {
        let response = self
            .post_json(
                "v1/summary",
                json!({ "file_name": file_name, "chunks": chunks }),
            )
            .await?;

        response
            .json::<DocumentSummaryMetadata>()
            .await
            .map_err(|error| {
                AgentError::InvalidResponse(format!("failed to decode summary response: {error}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client_for(server: &MockServer) -> HttpAgentClient {
        HttpAgentClient::new(server.base_url(), None)
    }

    #[tokio::test]
    async fn generate_decodes_successful_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/metadata");
                then.status(200).json_body(json!({
                    "title": "Quarterly revenue",
                    "hashtags": ["#finance"],
                    "hypothetical_questions": ["What was Q3 revenue?"],
                    "summary": "Revenue table for Q3."
                }));
            })
            .await;

        let metadata = client_for(&server)
            .generate("Row 0: quarter: Q3, revenue: 10")
            .await
            .expect("metadata");

        mock.assert();
        assert_eq!(metadata.title, "Quarterly revenue");
        assert_eq!(metadata.hashtags, vec!["#finance"]);
    }

    #[tokio::test]
    async fn generate_maps_429_to_rate_limited() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/metadata");
                then.status(429).body("slow down");
            })
            .await;

        let error = client_for(&server)
            .generate("text")
            .await
            .expect_err("rate limited");
        assert!(matches!(error, AgentError::RateLimited(_)));
    }

    #[tokio::test]
    async fn summarize_surfaces_server_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/summary");
                then.status(500).body("boom");
            })
            .await;

        let error = client_for(&server)
            .summarize(&["chunk one".into()], "report.pdf")
            .await
            .expect_err("error response");
        assert!(matches!(error, AgentError::GenerationFailed(message) if message.contains("500")));
    }

    #[tokio::test]
    async fn summarize_rejects_malformed_payloads() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/summary");
                then.status(200).body("not json");
            })
            .await;

        let error = client_for(&server)
            .summarize(&["chunk".into()], "report.pdf")
            .await
            .expect_err("decode failure");
        assert!(matches!(error, AgentError::InvalidResponse(_)));
    }
}
