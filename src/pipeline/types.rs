//! Core data types and error definitions for the ingestion pipeline.

use crate::config::{ProcessingConfig, ProcessingMethod};
use crate::pipeline::tabular::TabularError;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;

/// A file handed to the pipeline: display name plus raw bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// File name as supplied by the uploader, including extension.
    pub name: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Convenience constructor used by callers and tests.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Observer for per-file status milestones.
///
/// Injected by the caller; the pipeline only needs the capability to report a
/// human-readable status string for a file name. Implementations must be cheap
/// and non-blocking: reports are fire-and-forget and may arrive from
/// concurrently running file tasks.
pub trait StatusReporter: Send + Sync {
    /// Record a status update for `file_name`.
    fn report(&self, file_name: &str, status: &str);
}

/// A unit of text derived from a tabular source file.
///
/// Owned by the processor that created it until handed to metadata generation
/// and then to the unified store.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Synthesized row text (`"Row {i}: col: val, ..."`).
    pub text: String,
    /// Zero-based data-row index within the source.
    pub row: usize,
    /// Original cell values keyed by column header.
    pub original_values: Map<String, Value>,
}

impl Chunk {
    /// Positional/original-value metadata attached to the chunk at ingest time.
    pub(crate) fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("row".into(), Value::from(self.row));
        metadata.insert(
            "original_values".into(),
            Value::Object(self.original_values.clone()),
        );
        metadata
    }
}

/// Per-chunk metadata produced by the metadata agent. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMetadata {
    /// Short title for the chunk.
    pub title: String,
    /// Hashtags describing the chunk.
    pub hashtags: Vec<String>,
    /// Questions the chunk could answer.
    pub hypothetical_questions: Vec<String>,
    /// One-paragraph summary of the chunk.
    pub summary: String,
}

/// An enriched chunk ready for the unified store: text, agent metadata,
/// positional index, and originating file name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Originating file name.
    pub source_name: String,
    /// Position of the chunk within the file.
    pub index: usize,
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
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Document-level rollup produced by the summary agent from the full ordered
/// sequence of a file's chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummaryMetadata {
    /// Comprehensive summary across all chunks.
    pub summary: String,
    /// Key points drawn from all chunks.
    pub key_points: Vec<String>,
    /// Classified document type.
    pub document_type: String,
    /// Main themes across all chunks.
    pub themes: Vec<String>,
    /// Combined unique hashtags.
    pub all_hashtags: Vec<String>,
    /// Selected important questions.
    pub key_questions: Vec<String>,
}

impl DocumentSummaryMetadata {
    /// Placeholder rollup substituted when the summary agent fails, so the
    /// file pipeline always completes with a [`FileSummary`].
    pub fn fallback() -> Self {
        Self {
            summary: "Error generating summary".to_string(),
            key_points: Vec::new(),
            document_type: "unknown".to_string(),
            themes: Vec::new(),
            all_hashtags: Vec::new(),
            key_questions: Vec::new(),
        }
    }
}

/// Final per-file record emitted on successful completion of a file's
/// pipeline. Never mutated after construction.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    /// Originating file name.
    pub file_name: String,
    /// Number of chunks produced by extraction/chunking, regardless of how
    /// many were successfully ingested.
    pub total_chunks: usize,
    /// Extraction strategy used for the run.
    pub processing_method: ProcessingMethod,
    /// Session identifier from the run configuration.
    pub session_id: String,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    /// Document-level summary text.
    pub summary: String,
    /// Key points from the document rollup.
    pub key_points: Vec<String>,
    /// Classified document type.
    pub document_type: String,
    /// Rollup extras: themes, combined hashtags, key questions.
    pub metadata: Map<String, Value>,
}

impl FileSummary {
    /// Assemble the record from a completed file pipeline.
    pub(crate) fn from_rollup(
        file_name: &str,
        total_chunks: usize,
        config: &ProcessingConfig,
        rollup: DocumentSummaryMetadata,
    ) -> Self {
        let mut metadata = Map::new();
        metadata.insert("themes".into(), string_list(rollup.themes));
        metadata.insert("all_hashtags".into(), string_list(rollup.all_hashtags));
        metadata.insert("key_questions".into(), string_list(rollup.key_questions));

        Self {
            file_name: file_name.to_string(),
            total_chunks,
            processing_method: config.processing_method,
            session_id: config.session_id.clone(),
            created_at: current_timestamp_rfc3339(),
            summary: rollup.summary,
            key_points: rollup.key_points,
            document_type: rollup.document_type,
            metadata,
        }
    }
}

/// Uniform return contract of the per-file extraction step.
///
/// Invariant: `success == true` implies `document_info` is `Some` and `error`
/// is `None`; `success == false` implies `document_info` is `None`. The
/// [`ProcessingResult::completed`] and [`ProcessingResult::failed`]
/// constructors are the only intended ways to build one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Whether extraction produced usable chunks.
    pub success: bool,
    /// Human-readable outcome description.
    pub message: String,
    /// Extraction strategy that handled the file.
    pub method_used: ProcessingMethod,
    /// Enriched chunks, present only on success.
    pub document_info: Option<Vec<DocumentInfo>>,
    /// Failure description, present only on failure.
    pub error: Option<String>,
}

impl ProcessingResult {
    /// Build a successful result carrying the extracted chunks.
    pub fn completed(
        message: impl Into<String>,
        method_used: ProcessingMethod,
        document_info: Vec<DocumentInfo>,
    ) -> Self {
        Self {
            success: true,
            message: message.into(),
            method_used,
            document_info: Some(document_info),
            error: None,
        }
    }

    /// Build a failed result carrying the error description.
    pub fn failed(
        message: impl Into<String>,
        method_used: ProcessingMethod,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            message: message.into(),
            method_used,
            document_info: None,
            error: Some(error.into()),
        }
    }
}

/// Errors that abort a single file's pipeline.
///
/// These are absorbed at the per-file task boundary: logged, reported through
/// the status observer, and the file is omitted from the result mapping.
/// Sibling files are unaffected.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Tabular bytes could not be parsed into rows.
    #[error("Failed to parse tabular data: {0}")]
    Tabular(#[from] TabularError),
    /// The blocking parse task was cancelled or panicked.
    #[error("Tabular parse task failed: {0}")]
    ParseTask(#[from] tokio::task::JoinError),
    /// The unified store rejected a chunk.
    #[error("Failed to ingest chunk: {0}")]
    Store(#[from] StoreError),
}

/// Current timestamp formatted for summary records.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

fn string_list(values: Vec<String>) -> Value {
    Value::Array(values.into_iter().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingMethod;

    fn test_config() -> ProcessingConfig {
        ProcessingConfig {
            api_key: None,
            parse_api_url: "http://127.0.0.1:1/".into(),
            agent_url: "http://127.0.0.1:1/".into(),
            store_url: "http://127.0.0.1:1/".into(),
            embedding_model: "text-embedding-3-small".into(),
            processing_method: ProcessingMethod::ParseApi,
            session_id: "session-1".into(),
        }
    }

    #[test]
    fn fallback_rollup_uses_placeholder_values() {
        let fallback = DocumentSummaryMetadata::fallback();
        assert_eq!(fallback.summary, "Error generating summary");
        assert_eq!(fallback.document_type, "unknown");
        assert!(fallback.key_points.is_empty());
        assert!(fallback.themes.is_empty());
        assert!(fallback.all_hashtags.is_empty());
        assert!(fallback.key_questions.is_empty());
    }

    #[test]
    fn processing_result_constructors_uphold_invariant() {
        let ok = ProcessingResult::completed("parsed", ProcessingMethod::ParseApi, Vec::new());
        assert!(ok.success);
        assert!(ok.document_info.is_some());
        assert!(ok.error.is_none());

        let failed = ProcessingResult::failed("boom", ProcessingMethod::ParseApi, "timeout");
        assert!(!failed.success);
        assert!(failed.document_info.is_none());
        assert_eq!(failed.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn file_summary_collects_rollup_extras_into_metadata() {
        let rollup = DocumentSummaryMetadata {
            summary: "all about birds".into(),
            key_points: vec!["wings".into()],
            document_type: "report".into(),
            themes: vec!["ornithology".into()],
            all_hashtags: vec!["#birds".into()],
            key_questions: vec!["can they fly?".into()],
        };
        let summary = FileSummary::from_rollup("birds.pdf", 4, &test_config(), rollup);
        assert_eq!(summary.file_name, "birds.pdf");
        assert_eq!(summary.total_chunks, 4);
        assert_eq!(summary.session_id, "session-1");
        assert_eq!(summary.metadata["themes"][0], "ornithology");
        assert_eq!(summary.metadata["all_hashtags"][0], "#birds");
        assert_eq!(summary.metadata["key_questions"][0], "can they fly?");
        assert!(summary.created_at.contains('T'));
    }

    #[test]
    fn chunk_metadata_preserves_row_and_original_values() {
        let mut original = Map::new();
        original.insert("name".into(), Value::String("alice".into()));
        let chunk = Chunk {
            text: "Row 0: name: alice".into(),
            row: 0,
            original_values: original,
        };
        let metadata = chunk.metadata();
        assert_eq!(metadata["row"], 0);
        assert_eq!(metadata["original_values"]["name"], "alice");
    }
}
