use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    files_processed: AtomicU64,
    chunks_produced: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed file and the number of chunks produced for it.
    pub fn record_file(&self, chunk_count: u64) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
        self.chunks_produced
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_processed: self.files_processed.load(Ordering::Relaxed),
            chunks_produced: self.chunks_produced.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of files that completed the pipeline since startup.
    pub files_processed: u64,
    /// Total chunk count produced across all completed files.
    pub chunks_produced: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_files_and_chunks() {
        let metrics = IngestMetrics::new();
        metrics.record_file(2);
        metrics.record_file(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.files_processed, 2);
        assert_eq!(snapshot.chunks_produced, 5);
    }

    #[test]
    fn snapshot_is_consistent() {
        let metrics = IngestMetrics::new();
        assert_eq!(metrics.snapshot().files_processed, 0);
        assert_eq!(metrics.snapshot().chunks_produced, 0);
    }
}
