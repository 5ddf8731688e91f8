//! Worker implementation for SQS polling
//!
//! Each worker runs one sequential poll-process-backoff loop against the shared queue
//! client and stops cooperatively when its cancellation token fires.

use crate::core::client::queue::{QueueClient, QueueMessage, ReceiveOptions};
use crate::worker::backoff::{Backoff, BackoffConfig};
use crate::worker::metrics::WorkerMetrics;
use crate::worker::processor::MessageProcessor;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Lifecycle of a worker. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Constructed, not yet submitted.
    Idle = 0,
    Running = 1,
    /// Stop requested while a batch was in hand; the batch is being finished.
    Draining = 2,
    Stopped = 3,
}

impl From<u8> for WorkerState {
    fn from(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            2 => WorkerState::Draining,
            _ => WorkerState::Stopped,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn get(&self) -> WorkerState {
        WorkerState::from(self.0.load(Ordering::Acquire))
    }

    /// Advance to `next` unless the worker is already past it.
    fn advance(&self, next: WorkerState) {
        self.0.fetch_max(next as u8, Ordering::AcqRel);
    }
}

/// Marks the worker Stopped however its future ends, including abort.
struct StoppedOnDrop(SharedState);

impl Drop for StoppedOnDrop {
    fn drop(&mut self) {
        self.0.advance(WorkerState::Stopped);
    }
}

fn extract_panic_message(panic: &Box<dyn Any + Send>) -> String {
    panic
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("Unknown panic")
        .to_string()
}

/// Result of a single poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Messages were received and dispatched.
    Processed(usize),
    /// The long poll expired with no messages; the worker backed off for `backoff`.
    Empty { backoff: Duration },
    /// The receive call failed; the worker backed off for `backoff`.
    Failed { backoff: Duration },
}

/// Per-worker settings, copied from the pool configuration.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub receive_options: ReceiveOptions,
    /// Pause after a productive poll. Zero polls again immediately.
    pub poll_delay: Duration,
    pub backoff: BackoffConfig,
}

/// Control side of a worker, kept by the pool after the worker itself has been
/// moved into its task.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    id: usize,
    cancellation_token: CancellationToken,
    state: SharedState,
}

impl WorkerHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Raise the stop flag. Idempotent.
    pub fn stop(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn state(&self) -> WorkerState {
        self.state.get()
    }
}

pub struct SqsWorker {
    id: usize,
    client: Arc<dyn QueueClient>,
    processor: Arc<dyn MessageProcessor>,
    metrics: Arc<dyn WorkerMetrics>,
    receive_options: ReceiveOptions,
    poll_delay: Duration,
    backoff: Backoff,
    cancellation_token: CancellationToken,
    state: SharedState,
}

impl SqsWorker {
    pub fn new(
        id: usize,
        client: Arc<dyn QueueClient>,
        processor: Arc<dyn MessageProcessor>,
        metrics: Arc<dyn WorkerMetrics>,
        settings: WorkerSettings,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            id,
            client,
            processor,
            metrics,
            receive_options: settings.receive_options,
            poll_delay: settings.poll_delay,
            backoff: Backoff::new(settings.backoff),
            cancellation_token,
            state: SharedState::default(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle { id: self.id, cancellation_token: self.cancellation_token.clone(), state: self.state.clone() }
    }

    /// Triggers a graceful stop
    pub fn stop(&self) {
        self.cancellation_token.cancel();
    }

    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Run the polling loop until the stop flag is observed.
    ///
    /// Receive and processing failures, processor panics included, never end the loop. The flag is checked at the
    /// top of every iteration, which is also right before the next receive; sleeps are
    /// cut short by it, an in-flight receive is not.
    pub async fn run(mut self) {
        let span = info_span!("worker", worker_id = self.id);
        async move {
            let _stopped = StoppedOnDrop(self.state.clone());
            self.state.advance(WorkerState::Running);
            info!(
                max_messages = self.receive_options.max_messages,
                wait_time_secs = self.receive_options.wait_time.as_secs(),
                "Starting worker"
            );

            while !self.cancellation_token.is_cancelled() {
                self.poll_once().await;
            }

            info!("Worker stopped");
        }
        .instrument(span)
        .await
    }

    /// One receive followed by either dispatch or backoff.
    pub async fn poll_once(&mut self) -> PollOutcome {
        self.metrics.record_poll(self.id);

        let received = self.client.receive(&self.receive_options).await;
        match received {
            Ok(messages) if messages.is_empty() => {
                self.metrics.record_empty_poll(self.id);
                let backoff = self.apply_backoff().await;
                PollOutcome::Empty { backoff }
            }
            Ok(messages) => {
                let count = messages.len();
                self.backoff.reset();
                self.metrics.record_messages_received(self.id, count);
                debug!(count, "Received messages");

                self.process_batch(messages).await;

                if !self.poll_delay.is_zero() {
                    self.sleep_unless_stopped(self.poll_delay).await;
                }
                PollOutcome::Processed(count)
            }
            Err(e) => {
                self.metrics.record_receive_failure(self.id);
                error!(
                    error = %e,
                    consecutive_failures = self.backoff.attempts() + 1,
                    "Failed to receive messages from queue"
                );
                let backoff = self.apply_backoff().await;
                PollOutcome::Failed { backoff }
            }
        }
    }

    /// Every message of a received batch is dispatched, even if stop is requested midway.
    async fn process_batch(&self, messages: Vec<QueueMessage>) {
        for message in &messages {
            if self.cancellation_token.is_cancelled() && self.state.get() == WorkerState::Running {
                info!(batch_size = messages.len(), "Stop requested, draining current batch");
                self.state.advance(WorkerState::Draining);
            }
            let span = info_span!("message", message_id = %message.message_id);
            self.handle_message(message).instrument(span).await;
        }
    }

    async fn handle_message(&self, message: &QueueMessage) {
        // A panicking processor must not take the polling loop down with it
        match AssertUnwindSafe(self.processor.process(message)).catch_unwind().await {
            Ok(Ok(())) => self.metrics.record_processed(self.id),
            Ok(Err(e)) => {
                self.metrics.record_processing_failure(self.id);
                error!(error = %e, "Failed to process message, leaving it for redelivery");
                return;
            }
            Err(panic) => {
                self.metrics.record_processing_failure(self.id);
                error!(
                    panic = %extract_panic_message(&panic),
                    "Message processor panicked, leaving message for redelivery"
                );
                return;
            }
        }

        match self.client.delete(message).await {
            Ok(()) => self.metrics.record_deleted(self.id),
            Err(e) => {
                self.metrics.record_delete_failure(self.id);
                warn!(error = %e, "Failed to delete processed message, it will be redelivered");
            }
        }
    }

    async fn apply_backoff(&mut self) -> Duration {
        let delay = self.backoff.next_delay();
        self.metrics.record_backoff(self.id, delay);
        debug!(backoff_ms = delay.as_millis() as u64, attempt = self.backoff.attempts(), "Applying backoff");
        self.sleep_unless_stopped(delay).await;
        delay
    }

    /// Returns false if the sleep was cut short by a stop request.
    async fn sleep_unless_stopped(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancellation_token.cancelled() => false,
            _ = sleep(duration) => true,
        }
    }
}
