//! Shared types used by the unified-store client.

use crate::pipeline::{AgentMetadata, Chunk, DocumentInfo};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with the unified store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid unified store URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Store responded with an unexpected status code.
    #[error("Unexpected store response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// One enriched chunk handed to the unified store for indexing.
#[derive(Debug, Clone, Serialize)]
pub struct UnifiedChunk {
    /// Originating file name.
    pub source_name: String,
    /// Position of the chunk within the file.
    pub index: usize,
    /// File-category tag (`pdf`, `image`, `excel`, `csv`, `other`).
    pub file_type: String,
    /// Chunk text content.
    pub text_chunk: String,
    /// Agent-generated title.
    pub title: String,
    /// Agent-generated hashtags.
    pub hashtags: Vec<String>,
    /// Agent-generated hypothetical questions.
    pub hypothetical_questions: Vec<String>,
    /// Agent-generated summary.
    pub summary: String,
    /// Positional/original-value metadata carried from extraction.
    pub metadata: Map<String, Value>,
}

impl UnifiedChunk {
    /// Build a record from an extraction-produced [`DocumentInfo`].
    pub fn from_document(info: &DocumentInfo, file_type: &str) -> Self {
        Self {
            source_name: info.source_name.clone(),
            index: info.index,
            file_type: file_type.to_string(),
            text_chunk: info.text_chunk.clone(),
            title: info.title.clone(),
            hashtags: info.hashtags.clone(),
            hypothetical_questions: info.hypothetical_questions.clone(),
            summary: info.summary.clone(),
            metadata: info.metadata.clone(),
        }
    }

    /// Build a record from a tabular chunk and its agent metadata.
    pub fn from_tabular(
        source_name: &str,
        index: usize,
        file_type: &str,
        chunk: &Chunk,
        agent: &AgentMetadata,
    ) -> Self {
        Self {
            source_name: source_name.to_string(),
            index,
            file_type: file_type.to_string(),
            text_chunk: chunk.text.clone(),
            title: agent.title.clone(),
            hashtags: agent.hashtags.clone(),
            hypothetical_questions: agent.hypothetical_questions.clone(),
            summary: agent.summary.clone(),
            metadata: chunk.metadata(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabular_record_carries_row_metadata() {
        let mut original = Map::new();
        original.insert("quarter".into(), Value::String("Q3".into()));
        let chunk = Chunk {
            text: "Row 2: quarter: Q3".into(),
            row: 2,
            original_values: original,
        };
        let agent = AgentMetadata {
            title: "Q3 row".into(),
            hashtags: vec!["#q3".into()],
            hypothetical_questions: vec![],
            summary: "third quarter".into(),
        };

        let record = UnifiedChunk::from_tabular("report.csv", 2, "csv", &chunk, &agent);
        assert_eq!(record.source_name, "report.csv");
        assert_eq!(record.file_type, "csv");
        assert_eq!(record.metadata["row"], 2);
        assert_eq!(record.metadata["original_values"]["quarter"], "Q3");
    }
}
