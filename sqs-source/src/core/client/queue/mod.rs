pub mod error;
pub mod sqs;

use async_trait::async_trait;
pub use error::QueueError;
use std::collections::HashMap;
use std::time::Duration;

/// SQS caps a single receive at ten messages.
pub const MAX_RECEIVE_MESSAGES: i32 = 10;
/// SQS caps long polling at twenty seconds.
pub const MAX_WAIT_TIME: Duration = Duration::from_secs(20);
/// SQS caps a message's visibility timeout at twelve hours.
pub const MAX_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(43_200);

/// A message received from the queue.
///
/// The receipt handle identifies this particular delivery; it is what `delete` and
/// `change_visibility` operate on, not the message id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub attributes: HashMap<String, String>,
}

impl QueueMessage {
    pub fn new(message_id: impl Into<String>, receipt_handle: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            receipt_handle: receipt_handle.into(),
            body: body.into(),
            attributes: HashMap::new(),
        }
    }
}

/// Parameters of a single receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOptions {
    pub max_messages: i32,
    /// Long-poll duration. Bounds how long a worker can be stuck inside `receive`.
    pub wait_time: Duration,
    pub visibility_timeout: Option<Duration>,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self { max_messages: MAX_RECEIVE_MESSAGES, wait_time: MAX_WAIT_TIME, visibility_timeout: None }
    }
}

/// Operations the worker pool needs from a message queue.
///
/// Implementations must be safe to call concurrently from every worker of a pool.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Receive up to `options.max_messages` messages, waiting at most `options.wait_time`.
    /// An empty vector means the long poll expired without messages.
    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueueMessage>, QueueError>;

    /// Acknowledge a message so it is never redelivered.
    async fn delete(&self, message: &QueueMessage) -> Result<(), QueueError>;

    /// Change how long a received message stays invisible to other consumers.
    /// A zero timeout makes it immediately available again.
    async fn change_visibility(&self, message: &QueueMessage, timeout: Duration) -> Result<(), QueueError>;

    /// Perform a health check on the queue service
    ///
    /// Verifies that the queue exists and that the credentials in use may read it.
    async fn health_check(&self) -> Result<(), QueueError>;

    /// Release connection resources. Idempotent; calls after the first do nothing.
    async fn close(&self);
}
