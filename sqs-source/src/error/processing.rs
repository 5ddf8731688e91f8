use thiserror::Error;

/// A single message could not be processed.
///
/// Never fatal to a worker: the message stays undeleted and is redelivered once its
/// visibility timeout expires.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Failed to parse message body: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to handle object s3://{bucket}/{key}: {reason}")]
    ObjectHandling { bucket: String, key: String, reason: String },

    #[error("Processing failed: {0}")]
    Other(String),
}

impl From<String> for ProcessingError {
    fn from(reason: String) -> Self {
        ProcessingError::Other(reason)
    }
}

impl From<&str> for ProcessingError {
    fn from(reason: &str) -> Self {
        ProcessingError::Other(reason.to_string())
    }
}
