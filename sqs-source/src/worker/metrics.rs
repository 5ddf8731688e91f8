//! Worker metrics for monitoring queue consumption
//!
//! These metrics provide visibility into worker behavior: polling efficiency,
//! receive failures, processing outcomes and acknowledgement failures.
//! The sink is fire-and-forget; nothing a worker does depends on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Metric names for worker operations
pub struct MetricNames {
    /// Counter for receive calls issued
    pub polls: &'static str,
    /// Counter for receive calls that returned no messages
    pub empty_polls: &'static str,
    /// Counter for receive calls that failed
    pub receive_failures: &'static str,
    /// Counter for messages received
    pub messages_received: &'static str,
    /// Counter for messages processed successfully
    pub messages_processed: &'static str,
    /// Counter for messages whose processing failed
    pub processing_failures: &'static str,
    /// Counter for messages deleted from the queue
    pub messages_deleted: &'static str,
    /// Counter for failed deletes
    pub delete_failures: &'static str,
    /// Histogram of backoff delays applied
    pub backoff_delay: &'static str,
}

pub static METRIC_NAMES: LazyLock<MetricNames> = LazyLock::new(|| MetricNames {
    polls: "sqs.worker.polls",
    empty_polls: "sqs.worker.polls.empty",
    receive_failures: "sqs.worker.receive.failures",
    messages_received: "sqs.worker.messages.received",
    messages_processed: "sqs.worker.messages.processed",
    processing_failures: "sqs.worker.messages.failed",
    messages_deleted: "sqs.worker.messages.deleted",
    delete_failures: "sqs.worker.messages.delete_failures",
    backoff_delay: "sqs.worker.backoff.delay",
});

/// Sink for worker counters and timers.
pub trait WorkerMetrics: Send + Sync {
    fn record_poll(&self, worker_id: usize);
    fn record_empty_poll(&self, worker_id: usize);
    fn record_receive_failure(&self, worker_id: usize);
    fn record_messages_received(&self, worker_id: usize, count: usize);
    fn record_processed(&self, worker_id: usize);
    fn record_processing_failure(&self, worker_id: usize);
    fn record_deleted(&self, worker_id: usize);
    fn record_delete_failure(&self, worker_id: usize);
    fn record_backoff(&self, worker_id: usize, delay: Duration);
}

/// Emits every metric as a structured `tracing` event carrying a `metric` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetrics;

impl WorkerMetrics for TracingMetrics {
    fn record_poll(&self, worker_id: usize) {
        trace!(metric = METRIC_NAMES.polls, worker_id, "Polling queue");
    }

    fn record_empty_poll(&self, worker_id: usize) {
        trace!(metric = METRIC_NAMES.empty_polls, worker_id, "No messages received");
    }

    fn record_receive_failure(&self, worker_id: usize) {
        debug!(metric = METRIC_NAMES.receive_failures, worker_id, "Receive failed");
    }

    fn record_messages_received(&self, worker_id: usize, count: usize) {
        debug!(metric = METRIC_NAMES.messages_received, worker_id, count, "Messages received");
    }

    fn record_processed(&self, worker_id: usize) {
        trace!(metric = METRIC_NAMES.messages_processed, worker_id, "Message processed");
    }

    fn record_processing_failure(&self, worker_id: usize) {
        debug!(metric = METRIC_NAMES.processing_failures, worker_id, "Message processing failed");
    }

    fn record_deleted(&self, worker_id: usize) {
        trace!(metric = METRIC_NAMES.messages_deleted, worker_id, "Message deleted");
    }

    fn record_delete_failure(&self, worker_id: usize) {
        warn!(metric = METRIC_NAMES.delete_failures, worker_id, "Message delete failed");
    }

    fn record_backoff(&self, worker_id: usize, delay: Duration) {
        trace!(metric = METRIC_NAMES.backoff_delay, worker_id, delay_ms = delay.as_millis() as u64, "Backoff applied");
    }
}

/// Point-in-time copy of [`InMemoryMetrics`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub polls: u64,
    pub empty_polls: u64,
    pub receive_failures: u64,
    pub messages_received: u64,
    pub messages_processed: u64,
    pub processing_failures: u64,
    pub messages_deleted: u64,
    pub delete_failures: u64,
    pub backoffs: u64,
    pub total_backoff_ms: u64,
}

/// Lock-free counters shared by all workers of a pool.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    polls: AtomicU64,
    empty_polls: AtomicU64,
    receive_failures: AtomicU64,
    messages_received: AtomicU64,
    messages_processed: AtomicU64,
    processing_failures: AtomicU64,
    messages_deleted: AtomicU64,
    delete_failures: AtomicU64,
    backoffs: AtomicU64,
    total_backoff_ms: AtomicU64,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            polls: self.polls.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
            receive_failures: self.receive_failures.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            processing_failures: self.processing_failures.load(Ordering::Relaxed),
            messages_deleted: self.messages_deleted.load(Ordering::Relaxed),
            delete_failures: self.delete_failures.load(Ordering::Relaxed),
            backoffs: self.backoffs.load(Ordering::Relaxed),
            total_backoff_ms: self.total_backoff_ms.load(Ordering::Relaxed),
        }
    }
}

impl WorkerMetrics for InMemoryMetrics {
    fn record_poll(&self, _worker_id: usize) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    fn record_empty_poll(&self, _worker_id: usize) {
        self.empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    fn record_receive_failure(&self, _worker_id: usize) {
        self.receive_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_messages_received(&self, _worker_id: usize, count: usize) {
        self.messages_received.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn record_processed(&self, _worker_id: usize) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_processing_failure(&self, _worker_id: usize) {
        self.processing_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_deleted(&self, _worker_id: usize) {
        self.messages_deleted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_delete_failure(&self, _worker_id: usize) {
        self.delete_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_backoff(&self, _worker_id: usize, delay: Duration) {
        self.backoffs.fetch_add(1, Ordering::Relaxed);
        self.total_backoff_ms.fetch_add(delay.as_millis() as u64, Ordering::Relaxed);
    }
}
