//! Ingestion service coordinating categorization, extraction, enrichment, and
//! the unified-store fan-out.
//!
//! Concurrency model: categories are processed one after another; files within
//! a category run as independent concurrent tasks; within a file, external
//! calls are bounded by the category's semaphore. There is no global cap
//! across categories or files beyond those per-operation bounds, so a batch of
//! many large files can still oversubscribe memory and external-call
//! concurrency in aggregate. No timeouts or cancellation are applied at this
//! layer; a hung collaborator call stalls its file's task.

use crate::{
    agents::{ChunkMetadataAgent, DocumentSummaryAgent, HttpAgentClient},
    config::ProcessingConfig,
    extraction::{DocumentExtractor, ParseApiExtractor},
    metrics::{IngestMetrics, MetricsSnapshot},
    pipeline::{
        categorize::{CategorizedFiles, ChunkSource, FileCategory, categorize_files},
        metadata::{generate_chunk_metadata, summarize_document},
        tabular::{TabularFormat, extract_rows},
        types::{FileSummary, PipelineError, StatusReporter, UploadedFile},
    },
    store::{HttpUnifiedStore, StoreError, UnifiedChunk, UnifiedStore},
};
use futures_util::future::{join_all, try_join_all};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Coordinates the full ingestion pipeline for a batch of uploaded files.
///
/// The service owns long-lived handles to the extraction backend, the
/// metadata/summary agents, the unified-store sink, and the metrics registry.
/// Construct it once per run with its [`ProcessingConfig`] and share it by
/// reference; configuration is read-only and safe across concurrent tasks.
pub struct IngestService {
    config: ProcessingConfig,
    extractor: Arc<dyn DocumentExtractor>,
    metadata_agent: Arc<dyn ChunkMetadataAgent>,
    summary_agent: Arc<dyn DocumentSummaryAgent>,
    store: Arc<dyn UnifiedStore>,
    metrics: Arc<IngestMetrics>,
}

impl IngestService {
    /// Build a service wired to the HTTP collaborators named in `config`.
    pub fn new(config: ProcessingConfig) -> Result<Self, StoreError> {
        let store = HttpUnifiedStore::new(&config.store_url, config.api_key.clone())?;
        let agents = Arc::new(HttpAgentClient::new(
            config.agent_url.clone(),
            config.api_key.clone(),
        ));
        Ok(Self::with_collaborators(
            config,
            Arc::new(ParseApiExtractor::new()),
            agents.clone(),
            agents,
            Arc::new(store),
        ))
    }

    /// Build a service with explicit collaborator implementations.
    ///
    /// This is the seam tests and embedders use to substitute in-process
    /// collaborators for the HTTP adapters.
    pub fn with_collaborators(
        config: ProcessingConfig,
        extractor: Arc<dyn DocumentExtractor>,
        metadata_agent: Arc<dyn ChunkMetadataAgent>,
        summary_agent: Arc<dyn DocumentSummaryAgent>,
        store: Arc<dyn UnifiedStore>,
    ) -> Self {
        Self {
            config,
            extractor,
            metadata_agent,
            summary_agent,
            store,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// The run configuration this service was built with.
    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Return the current ingestion metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Process a batch of uploaded files into a file-name → summary mapping.
    ///
    /// Files are bucketed by extension, each non-empty bucket is processed in
    /// table order, and files within a bucket run concurrently. The returned
    /// mapping contains only files whose pipeline fully succeeded; failures
    /// are logged and reported through `status`, and callers diff against
    /// their input to detect omissions. Later files with a duplicate name
    /// overwrite earlier entries.
    pub async fn process_files(
        &self,
        files: Vec<UploadedFile>,
        status: Option<&dyn StatusReporter>,
    ) -> HashMap<String, FileSummary> {
        let categorized: CategorizedFiles = categorize_files(files);

        for file in &categorized.unsupported {
            tracing::warn!(file = %file.name, "Skipping file with unsupported extension");
            report(status, &file.name, "Skipped: unsupported file type");
        }

        let mut summaries = HashMap::new();
        for category in FileCategory::ALL {
            let bucket = categorized.bucket(category);
            if bucket.is_empty() {
                continue;
            }
            tracing::info!(
                category = category.tag(),
                files = bucket.len(),
                "Processing category"
            );
            let results = join_all(
                bucket
                    .iter()
                    .map(|file| self.process_file(category, file, status)),
            )
            .await;
            summaries.extend(results.into_iter().flatten());
        }

        summaries
    }

    /// Run one file's pipeline, absorbing failures at the task boundary.
    async fn process_file(
        &self,
        category: FileCategory,
        file: &UploadedFile,
        status: Option<&dyn StatusReporter>,
    ) -> Option<(String, FileSummary)> {
        match self.run_file(category, file, status).await {
            Ok(Some(summary)) => {
                self.metrics.record_file(summary.total_chunks as u64);
                tracing::info!(
                    file = %file.name,
                    chunks = summary.total_chunks,
                    "File processed"
                );
                report(status, &file.name, "Processing complete");
                Some((file.name.clone(), summary))
            }
            Ok(None) => None,
            Err(error) => {
                tracing::error!(file = %file.name, error = %error, "Error processing file");
                report(status, &file.name, &format!("Error: {error}"));
                None
            }
        }
    }

    async fn run_file(
        &self,
        category: FileCategory,
        file: &UploadedFile,
        status: Option<&dyn StatusReporter>,
    ) -> Result<Option<FileSummary>, PipelineError> {
        match category.chunk_source() {
            ChunkSource::Extraction => self.run_extracted_file(category, file, status).await,
            ChunkSource::Tabular(format) => self
                .run_tabular_file(category, format, file, status)
                .await
                .map(Some),
        }
    }

    /// Pipeline for categories whose extraction collaborator chunks and
    /// enriches server-side (document-like, image, other).
    async fn run_extracted_file(
        &self,
        category: FileCategory,
        file: &UploadedFile,
        status: Option<&dyn StatusReporter>,
    ) -> Result<Option<FileSummary>, PipelineError> {
        let result = self
            .extractor
            .extract(file, &self.config, category.concurrency_limit(), status)
            .await;

        let document_info = match (result.success, result.document_info) {
            (true, Some(docs)) if !docs.is_empty() => docs,
            _ => {
                let error = result
                    .error
                    .unwrap_or_else(|| "extraction returned no chunks".to_string());
                tracing::error!(file = %file.name, error = %error, "Extraction failed");
                report(status, &file.name, &format!("Error: {error}"));
                return Ok(None);
            }
        };

        // All ingests run concurrently and must complete before the rollup.
        try_join_all(document_info.iter().map(|info| {
            self.store.ingest(
                UnifiedChunk::from_document(info, category.tag()),
                &self.config,
            )
        }))
        .await?;

        let texts: Vec<String> = document_info
            .iter()
            .map(|info| info.text_chunk.clone())
            .collect();
        let rollup = summarize_document(self.summary_agent.as_ref(), &texts, &file.name).await;

        Ok(Some(FileSummary::from_rollup(
            &file.name,
            document_info.len(),
            &self.config,
            rollup,
        )))
    }

    /// Pipeline for spreadsheet/CSV categories: rows are parsed off the async
    /// runtime, then enriched here under the category's semaphore.
    async fn run_tabular_file(
        &self,
        category: FileCategory,
        format: TabularFormat,
        file: &UploadedFile,
        status: Option<&dyn StatusReporter>,
    ) -> Result<FileSummary, PipelineError> {
        let kind = match format {
            TabularFormat::Workbook => "spreadsheet",
            TabularFormat::Delimited => "CSV",
        };
        report(status, &file.name, &format!("Processing {kind} file..."));

        let bytes = file.bytes.clone();
        let chunks = tokio::task::spawn_blocking(move || extract_rows(format, &bytes)).await??;

        let limiter = Semaphore::new(category.concurrency_limit());
        let metadata = join_all(chunks.iter().enumerate().map(|(index, chunk)| {
            generate_chunk_metadata(
                self.metadata_agent.as_ref(),
                &limiter,
                &chunk.text,
                &file.name,
                index,
            )
        }))
        .await;

        // Only chunks whose metadata came back are ingested; the chunk count
        // still reflects every row produced.
        try_join_all(chunks.iter().zip(metadata.iter()).enumerate().filter_map(
            |(index, (chunk, result))| {
                result.as_ref().map(|agent| {
                    self.store.ingest(
                        UnifiedChunk::from_tabular(&file.name, index, category.tag(), chunk, agent),
                        &self.config,
                    )
                })
            },
        ))
        .await?;

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let rollup = summarize_document(self.summary_agent.as_ref(), &texts, &file.name).await;

        Ok(FileSummary::from_rollup(
            &file.name,
            chunks.len(),
            &self.config,
            rollup,
        ))
    }
}

fn report(status: Option<&dyn StatusReporter>, file_name: &str, message: &str) {
    if let Some(reporter) = status {
        reporter.report(file_name, message);
    }
}
