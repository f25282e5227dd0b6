//! Per-chunk metadata generation and document-level rollups.

use crate::agents::{AgentError, ChunkMetadataAgent, DocumentSummaryAgent};
use crate::pipeline::types::{AgentMetadata, DocumentSummaryMetadata};
use crate::retry::retry_with_delay;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Attempts made per chunk before giving up on its metadata.
const METADATA_ATTEMPTS: usize = 3;
/// Pause between chunk-metadata attempts.
const METADATA_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Generate metadata for one chunk under the category's concurrency limit.
///
/// Acquires a semaphore slot per attempt, bounding in-flight agent calls for
/// the file. Failures are retried with a fixed delay; after the final attempt
/// the error is logged with the file name and chunk index and `None` is
/// returned. Downstream callers treat `None` as "no metadata available" and
/// skip ingesting the chunk's enrichment rather than failing the file.
pub(crate) async fn generate_chunk_metadata(
    agent: &dyn ChunkMetadataAgent,
    limiter: &Semaphore,
    text: &str,
    file_name: &str,
    index: usize,
) -> Option<AgentMetadata> {
    let outcome = retry_with_delay(METADATA_ATTEMPTS, METADATA_RETRY_DELAY, || async {
        let _permit = limiter
            .acquire()
            .await
            .map_err(|_| AgentError::Unavailable("metadata limiter closed".to_string()))?;
        agent.generate(text).await
    })
    .await;

    match outcome {
        Ok(metadata) => Some(metadata),
        Err(error) => {
            tracing::error!(
                file = %file_name,
                chunk = index,
                error = %error,
                "Failed to generate chunk metadata"
            );
            None
        }
    }
}

/// Reduce all chunks of one file into a document-level rollup.
///
/// Single call, not retried and not semaphore-bounded. On failure the error is
/// logged and the placeholder rollup is returned, so the file pipeline always
/// completes with a summary record.
pub(crate) async fn summarize_document(
    agent: &dyn DocumentSummaryAgent,
    chunks: &[String],
    file_name: &str,
) -> DocumentSummaryMetadata {
    match agent.summarize(chunks, file_name).await {
        Ok(rollup) => rollup,
        Err(error) => {
            tracing::error!(
                file = %file_name,
                error = %error,
                "Failed to generate document summary"
            );
            DocumentSummaryMetadata::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyAgent {
        calls: AtomicUsize,
        failures: usize,
    }

    #[async_trait]
    impl ChunkMetadataAgent for FlakyAgent {
        async fn generate(&self, text: &str) -> Result<AgentMetadata, AgentError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(AgentError::GenerationFailed("model overloaded".into()))
            } else {
                Ok(AgentMetadata {
                    title: format!("title for {text}"),
                    hashtags: vec!["#test".into()],
                    hypothetical_questions: vec![],
                    summary: "ok".into(),
                })
            }
        }
    }

    struct FailingSummaryAgent;

    #[async_trait]
    impl DocumentSummaryAgent for FailingSummaryAgent {
        async fn summarize(
            &self,
            _chunks: &[String],
            _file_name: &str,
        ) -> Result<DocumentSummaryMetadata, AgentError> {
            Err(AgentError::GenerationFailed("summary model down".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn chunk_metadata_survives_transient_failures() {
        let agent = FlakyAgent {
            calls: AtomicUsize::new(0),
            failures: 2,
        };
        let limiter = Semaphore::new(2);

        let metadata =
            generate_chunk_metadata(&agent, &limiter, "Row 0: a: 1", "rows.csv", 0).await;
        assert_eq!(metadata.expect("metadata").hashtags, vec!["#test"]);
        assert_eq!(agent.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn chunk_metadata_degrades_to_none_after_exhaustion() {
        let agent = FlakyAgent {
            calls: AtomicUsize::new(0),
            failures: usize::MAX,
        };
        let limiter = Semaphore::new(1);

        let metadata =
            generate_chunk_metadata(&agent, &limiter, "Row 1: a: 2", "rows.csv", 1).await;
        assert!(metadata.is_none());
        assert_eq!(agent.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn summary_failure_returns_fallback_rollup() {
        let rollup =
            summarize_document(&FailingSummaryAgent, &["chunk".to_string()], "rows.csv").await;
        assert_eq!(rollup.document_type, "unknown");
        assert_eq!(rollup.summary, "Error generating summary");
        assert!(rollup.key_points.is_empty());
        assert!(rollup.themes.is_empty());
        assert!(rollup.all_hashtags.is_empty());
        assert!(rollup.key_questions.is_empty());
    }
}
