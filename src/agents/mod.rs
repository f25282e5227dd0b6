//! Agent collaborator seams for chunk enrichment and document rollups.
//!
//! The pipeline never talks to a model directly; it calls through the two
//! traits below. [`HttpAgentClient`] is the default adapter for a remote
//! metadata service, and tests substitute in-process stubs.

mod http;

pub use http::HttpAgentClient;

use crate::pipeline::{AgentMetadata, DocumentSummaryMetadata};
use crate::retry::CallFailure;
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by agent collaborators.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Agent endpoint was unreachable or missing.
    #[error("Agent endpoint unavailable: {0}")]
    Unavailable(String),
    /// The provider rejected the call due to rate limiting.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
    /// The provider returned an error response.
    #[error("Failed to generate metadata: {0}")]
    GenerationFailed(String),
    /// The provider response could not be parsed.
    #[error("Malformed agent response: {0}")]
    InvalidResponse(String),
}

impl CallFailure for AgentError {
    fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited(_))
            || self.to_string().to_lowercase().contains("rate limit")
    }
}

/// Produces structured metadata for a single chunk of text.
#[async_trait]
pub trait ChunkMetadataAgent: Send + Sync {
    /// Generate title, hashtags, hypothetical questions, and a summary for
    /// `text`.
    async fn generate(&self, text: &str) -> Result<AgentMetadata, AgentError>;
}

/// Reduces all chunks of one file into an overall document rollup.
#[async_trait]
pub trait DocumentSummaryAgent: Send + Sync {
    /// Summarize the ordered chunk texts of `file_name`.
    async fn summarize(
        &self,
        chunks: &[String],
        file_name: &str,
    ) -> Result<DocumentSummaryMetadata, AgentError>;
}
