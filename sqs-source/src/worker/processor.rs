use crate::core::client::queue::QueueMessage;
use crate::error::ProcessingError;
use async_trait::async_trait;

/// Processing collaborator invoked once per received message.
///
/// Returning `Ok` lets the worker delete the message. An `Err` leaves it on the queue;
/// redelivery after the visibility timeout is the retry mechanism, the worker never
/// retries a message itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process(&self, message: &QueueMessage) -> Result<(), ProcessingError>;
}
