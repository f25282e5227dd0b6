//! Extension-based file categorization.

use crate::pipeline::tabular::TabularFormat;
use crate::pipeline::types::UploadedFile;
use std::path::Path;

/// File-type bucket handled by one per-category pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileCategory {
    /// PDF-like documents routed through the parse backend.
    Document,
    /// Images routed through the parse backend at lower concurrency.
    Image,
    /// Workbook spreadsheets chunked locally row by row.
    Spreadsheet,
    /// Delimited files chunked locally row by row.
    Csv,
    /// Plain-text-like files routed through the parse backend.
    Other,
}

/// How a category's files are turned into chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkSource {
    /// The extraction collaborator chunks and enriches server-side.
    Extraction,
    /// Rows are parsed locally off the async runtime, then enriched here.
    Tabular(TabularFormat),
}

impl FileCategory {
    /// Categories in table order; the first matching entry wins.
    pub const ALL: [FileCategory; 5] = [
        FileCategory::Document,
        FileCategory::Image,
        FileCategory::Spreadsheet,
        FileCategory::Csv,
        FileCategory::Other,
    ];

    /// Extensions claimed by this category (lower-case, no dot).
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Document => &["pdf", "docx", "doc", "odt", "pptx", "ppt"],
            Self::Image => &["png", "jpg", "jpeg"],
            Self::Spreadsheet => &["xlsx", "xls"],
            Self::Csv => &["csv"],
            Self::Other => &["txt", "json", "xml"],
        }
    }

    /// File-type tag recorded on every ingested chunk.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Document => "pdf",
            Self::Image => "image",
            Self::Spreadsheet => "excel",
            Self::Csv => "csv",
            Self::Other => "other",
        }
    }

    /// Bound on concurrent external calls for one file of this category.
    ///
    /// For extraction categories this is the limit handed to the parse
    /// backend; for tabular categories it sizes the per-chunk metadata
    /// semaphore. Images get a lower bound.
    pub fn concurrency_limit(self) -> usize {
        match self {
            Self::Image => 3,
            _ => 5,
        }
    }

    /// Chunking strategy for this category.
    pub fn chunk_source(self) -> ChunkSource {
        match self {
            Self::Spreadsheet => ChunkSource::Tabular(TabularFormat::Workbook),
            Self::Csv => ChunkSource::Tabular(TabularFormat::Delimited),
            _ => ChunkSource::Extraction,
        }
    }
}

/// Files bucketed by category, plus the ones no category claimed.
///
/// Unsupported files are kept explicit rather than dropped on the floor; the
/// dispatcher logs and reports them, and they never reach the result mapping.
#[derive(Debug, Default)]
pub struct CategorizedFiles {
    buckets: [Vec<UploadedFile>; 5],
    /// Files whose extension matched no category table entry.
    pub unsupported: Vec<UploadedFile>,
}

impl CategorizedFiles {
    /// Files bucketed into `category`, empty when unused.
    pub fn bucket(&self, category: FileCategory) -> &[UploadedFile] {
        &self.buckets[Self::slot(category)]
    }

    fn bucket_mut(&mut self, category: FileCategory) -> &mut Vec<UploadedFile> {
        &mut self.buckets[Self::slot(category)]
    }

    fn slot(category: FileCategory) -> usize {
        match category {
            FileCategory::Document => 0,
            FileCategory::Image => 1,
            FileCategory::Spreadsheet => 2,
            FileCategory::Csv => 3,
            FileCategory::Other => 4,
        }
    }
}

/// Classify uploaded files by lower-cased extension lookup.
///
/// Pure function: each file lands in exactly the first category whose table
/// claims its extension, or in the `unsupported` bucket.
pub fn categorize_files(files: Vec<UploadedFile>) -> CategorizedFiles {
    let mut categorized = CategorizedFiles::default();

    'files: for file in files {
        let extension = Path::new(&file.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        for category in FileCategory::ALL {
            if category.extensions().contains(&extension.as_str()) {
                categorized.bucket_mut(category).push(file);
                continue 'files;
            }
        }

        categorized.unsupported.push(file);
    }

    categorized
}
