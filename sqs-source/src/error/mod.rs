pub mod pool;
pub mod processing;

use thiserror::Error;

use crate::core::client::queue::QueueError;
pub use pool::PoolError;
pub use processing::ProcessingError;

/// Result type for sqs-source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Error types for the sqs-source service
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Queue error: {0}")]
    QueueError(#[from] QueueError),

    #[error("Worker pool error: {0}")]
    PoolError(#[from] PoolError),

    #[error("Processing error: {0}")]
    ProcessingError(#[from] ProcessingError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Source Error: {0}")]
    SourceAnyHowError(#[from] anyhow::Error),
}

/// Invalid values supplied on the command line or through the environment.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Worker count must be at least 1")]
    ZeroWorkers,

    #[error("Max messages per poll must be between 1 and {max}, got {value}")]
    MaxMessagesOutOfRange { value: i32, max: i32 },

    #[error("Wait time must not exceed {max_secs} seconds, got {value_secs}")]
    WaitTimeOutOfRange { value_secs: u64, max_secs: u64 },

    #[error("Visibility timeout must not exceed {max_secs} seconds, got {value_secs}")]
    VisibilityTimeoutOutOfRange { value_secs: u64, max_secs: u64 },

    #[error("Shutdown timeout must be positive")]
    ZeroShutdownTimeout,

    #[error("Invalid backoff configuration: {0}")]
    InvalidBackoff(String),

    #[error("Invalid queue url '{0}'")]
    InvalidQueueUrl(String),
}
