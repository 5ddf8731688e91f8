use aws_sdk_sqs::error::SdkError;
use aws_sdk_sqs::operation::change_message_visibility::ChangeMessageVisibilityError;
use aws_sdk_sqs::operation::delete_message::DeleteMessageError;
use aws_sdk_sqs::operation::get_queue_attributes::GetQueueAttributesError;
use aws_sdk_sqs::operation::receive_message::ReceiveMessageError;
use thiserror::Error;

/// Failures surfaced by a [`QueueClient`](super::QueueClient).
///
/// Every variant is transient from the worker's point of view: the worker logs it,
/// advances its backoff and polls again.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to receive messages: {0}")]
    ReceiveMessage(#[from] SdkError<ReceiveMessageError>),

    #[error("Failed to delete message: {0}")]
    DeleteMessage(#[from] SdkError<DeleteMessageError>),

    #[error("Failed to change message visibility: {0}")]
    ChangeVisibility(#[from] SdkError<ChangeMessageVisibilityError>),

    #[error("Failed to get queue attributes: {0}")]
    GetQueueAttributes(#[from] SdkError<GetQueueAttributesError>),

    #[error("Message {0} has no receipt handle")]
    MissingReceiptHandle(String),

    #[error("{name} of {value_secs}s exceeds the SQS limit of {max_secs}s")]
    TimeoutOutOfRange { name: &'static str, value_secs: u64, max_secs: u64 },

    #[error("Queue client is closed")]
    Closed,

    /// Failure of a [`QueueClient`](super::QueueClient) implementation that does not
    /// go through the AWS SDK, such as an in-process or proxied queue.
    #[error("Queue transport error: {0}")]
    Transport(String),
}
