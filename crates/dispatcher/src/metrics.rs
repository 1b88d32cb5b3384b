//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one dispatcher
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Batches fully persisted
    batch_count: AtomicU64,
    /// Successful requests (one per table group)
    request_count: AtomicU64,
    /// Records persisted
    record_count: AtomicU64,
    /// Request body bytes persisted
    byte_count: AtomicU64,
    /// Rejected or unanswered requests
    failure_count: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_count(&self) -> u64 {
        self.batch_count.load(Ordering::Relaxed)
    }

    pub fn inc_batch_count(&self) {
        self.batch_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Count one successful request carrying `records` records in `bytes` bytes
    pub fn record_request(&self, records: usize, bytes: usize) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.record_count.fetch_add(records as u64, Ordering::Relaxed);
        self.byte_count.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_count(&self) -> u64 {
        self.record_count.load(Ordering::Relaxed)
    }

    pub fn byte_count(&self) -> u64 {
        self.byte_count.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batch_count: self.batch_count(),
            request_count: self.request_count(),
            record_count: self.record_count(),
            byte_count: self.byte_count(),
            failure_count: self.failure_count(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub batch_count: u64,
    pub request_count: u64,
    pub record_count: u64,
    pub byte_count: u64,
    pub failure_count: u64,
}
