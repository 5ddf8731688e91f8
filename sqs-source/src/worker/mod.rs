pub mod backoff;
pub mod executor;
pub mod metrics;
pub mod notification;
pub mod pool;
pub mod processor;
pub mod sqs_worker;

pub use backoff::{Backoff, BackoffConfig};
pub use pool::{ShutdownOutcome, WorkerPool};
pub use processor::MessageProcessor;
pub use sqs_worker::{PollOutcome, SqsWorker, WorkerHandle, WorkerState};
