pub mod queue;

pub use queue::sqs::SqsQueueClient;
pub use queue::{QueueClient, QueueError, QueueMessage, ReceiveOptions};
