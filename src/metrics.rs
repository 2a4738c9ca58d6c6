use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for blob reassembly across all invocations
///
/// Thread-safe atomic counters; each reassembler records into the global
/// [`REASSEMBLY_METRICS`] instance.
#[derive(Default)]
pub struct ReassemblyMetrics {
    /// Blob chunks consumed
    pub chunks_received: AtomicU64,

    /// Chunk payload bytes consumed
    pub chunk_bytes: AtomicU64,

    /// Blobs emitted after their terminal chunk
    pub blobs_completed: AtomicU64,

    /// Bytes emitted inside completed blobs
    pub bytes_reassembled: AtomicU64,

    /// Non-chunk messages forwarded untouched
    pub messages_passed_through: AtomicU64,

    /// Chunks rejected by a size guard
    pub limit_violations: AtomicU64,

    /// Blobs dropped without a terminal chunk
    pub blobs_abandoned: AtomicU64,
}

impl ReassemblyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_chunk(&self, size: usize) {
        self.chunks_received.fetch_add(1, Ordering::Relaxed);
        self.chunk_bytes.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn record_blob(&self, size: usize) {
        self.blobs_completed.fetch_add(1, Ordering::Relaxed);
        self.bytes_reassembled
            .fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn record_passthrough(&self) {
        self.messages_passed_through.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_limit_violation(&self) {
        self.limit_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self, count: usize) {
        self.blobs_abandoned
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Average number of chunks per completed blob
    pub fn avg_chunks_per_blob(&self) -> f64 {
        let chunks = self.chunks_received.load(Ordering::Relaxed);
        let blobs = self.blobs_completed.load(Ordering::Relaxed);
        if blobs > 0 {
            chunks as f64 / blobs as f64
        } else {
            0.0
        }
    }

    /// Get snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            chunks_received: self.chunks_received.load(Ordering::Relaxed),
            chunk_bytes: self.chunk_bytes.load(Ordering::Relaxed),
            blobs_completed: self.blobs_completed.load(Ordering::Relaxed),
            bytes_reassembled: self.bytes_reassembled.load(Ordering::Relaxed),
            messages_passed_through: self.messages_passed_through.load(Ordering::Relaxed),
            limit_violations: self.limit_violations.load(Ordering::Relaxed),
            blobs_abandoned: self.blobs_abandoned.load(Ordering::Relaxed),
            avg_chunks_per_blob: self.avg_chunks_per_blob(),
        }
    }

    /// Reset all metrics (useful for testing)
    pub fn reset(&self) {
        self.chunks_received.store(0, Ordering::Relaxed);
        self.chunk_bytes.store(0, Ordering::Relaxed);
        self.blobs_completed.store(0, Ordering::Relaxed);
        self.bytes_reassembled.store(0, Ordering::Relaxed);
        self.messages_passed_through.store(0, Ordering::Relaxed);
        self.limit_violations.store(0, Ordering::Relaxed);
        self.blobs_abandoned.store(0, Ordering::Relaxed);
    }
}

/// Immutable snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub chunks_received: u64,
    pub chunk_bytes: u64,
    pub blobs_completed: u64,
    pub bytes_reassembled: u64,
    pub messages_passed_through: u64,
    pub limit_violations: u64,
    pub blobs_abandoned: u64,
    pub avg_chunks_per_blob: f64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Reassembly: {} blobs ({} bytes, avg {:.1} chunks), {} passed through, {} limit violations, {} abandoned",
            self.blobs_completed,
            self.bytes_reassembled,
            self.avg_chunks_per_blob,
            self.messages_passed_through,
            self.limit_violations,
            self.blobs_abandoned
        )
    }
}

lazy_static::lazy_static! {
    /// Global metrics instance
    pub static ref REASSEMBLY_METRICS: ReassemblyMetrics = ReassemblyMetrics::new();
}
