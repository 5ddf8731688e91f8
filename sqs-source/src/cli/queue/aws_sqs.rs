use clap::Args;
use url::Url;

/// Parameters used to config AWS SQS.
#[derive(Debug, Clone, Args)]
pub struct AWSSQSCliArgs {
    /// The URL of the queue to consume.
    /// i.e https://sqs.us-east-1.amazonaws.com/123456789012/my-bucket-events
    #[arg(env = "SQS_SOURCE_QUEUE_URL", long)]
    pub queue_url: Url,

    /// Maximum number of messages fetched by a single receive call (1-10).
    #[arg(env = "SQS_SOURCE_MAX_MESSAGES", long, default_value = "10")]
    pub max_messages: i32,

    /// Long-poll duration of a receive call in seconds (0-20).
    /// Also bounds how long a stop request can go unnoticed by a polling worker.
    #[arg(env = "SQS_SOURCE_WAIT_TIME_SECONDS", long, default_value = "20")]
    pub wait_time_seconds: u64,

    /// Visibility timeout applied to received messages. The queue default is used when unset.
    #[arg(env = "SQS_SOURCE_VISIBILITY_TIMEOUT_SECONDS", long)]
    pub visibility_timeout_seconds: Option<u64>,

    /// Pause in milliseconds after a poll that returned messages.
    #[arg(env = "SQS_SOURCE_POLL_DELAY_MS", long, default_value = "0")]
    pub poll_delay_ms: u64,
}
