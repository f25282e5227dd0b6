//! File-ingestion pipeline: categorization, chunking, enrichment, and rollups.

pub mod categorize;
mod metadata;
mod service;
pub mod tabular;
pub mod types;

pub use categorize::{CategorizedFiles, ChunkSource, FileCategory, categorize_files};
pub use service::IngestService;
pub use types::{
    AgentMetadata, Chunk, DocumentInfo, DocumentSummaryMetadata, FileSummary, PipelineError,
    ProcessingResult, StatusReporter, UploadedFile,
};
