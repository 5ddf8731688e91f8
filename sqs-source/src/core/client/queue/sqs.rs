use crate::core::client::queue::{
    QueueClient, QueueError, QueueMessage, ReceiveOptions, MAX_VISIBILITY_TIMEOUT, MAX_WAIT_TIME,
};
use crate::types::params::QueueArgs;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sqs::types::{Message, QueueAttributeName};
use aws_sdk_sqs::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// [`QueueClient`] backed by a single AWS SQS queue.
#[derive(Debug)]
pub struct SqsQueueClient {
    client: Client,
    queue_url: String,
    closed: AtomicBool,
}

impl SqsQueueClient {
    /// new - Create a new SQS client from an already loaded AWS configuration.
    /// An endpoint override in `args` (e.g. localstack) takes precedence over the
    /// endpoint resolved from the configuration.
    pub fn new(aws_config: &SdkConfig, args: &QueueArgs) -> Self {
        let mut builder = aws_sdk_sqs::config::Builder::from(aws_config);
        if let Some(endpoint) = &args.endpoint_url {
            builder = builder.endpoint_url(endpoint.as_str());
        }
        Self { client: Client::from_conf(builder.build()), queue_url: args.queue_url.clone(), closed: AtomicBool::new(false) }
    }

    /// Load the AWS configuration from the environment (credentials chain, profile)
    /// and build a client for the queue in `args`.
    pub async fn from_args(args: &QueueArgs) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &args.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let aws_config = loader.load().await;
        Self::new(&aws_config, args)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        Ok(())
    }
}

/// Convert an SDK message into the transport-neutral [`QueueMessage`].
/// Both system attributes and string message attributes end up in `attributes`.
fn into_queue_message(message: Message) -> Result<QueueMessage, QueueError> {
    let message_id = message.message_id.unwrap_or_default();
    let receipt_handle = message.receipt_handle.ok_or_else(|| QueueError::MissingReceiptHandle(message_id.clone()))?;

    let mut attributes = HashMap::new();
    if let Some(system_attributes) = message.attributes {
        for (name, value) in system_attributes {
            attributes.insert(name.as_str().to_string(), value);
        }
    }
    if let Some(message_attributes) = message.message_attributes {
        for (name, value) in message_attributes {
            if let Some(string_value) = value.string_value {
                attributes.insert(name, string_value);
            }
        }
    }

    Ok(QueueMessage { message_id, receipt_handle, body: message.body.unwrap_or_default(), attributes })
}

/// Keep every message of a batch that converts, dropping the rest with a warning.
/// A dropped message stays invisible until its visibility timeout expires and is
/// then redelivered.
fn into_queue_messages(messages: Vec<Message>) -> Vec<QueueMessage> {
    messages
        .into_iter()
        .filter_map(|message| match into_queue_message(message) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(error = %e, "Skipping received message");
                None
            }
        })
        .collect()
}

/// Seconds the SQS API expects for `timeout`, rejecting anything above `max`.
fn timeout_secs(name: &'static str, timeout: Duration, max: Duration) -> Result<i32, QueueError> {
    let out_of_range = || QueueError::TimeoutOutOfRange { name, value_secs: timeout.as_secs(), max_secs: max.as_secs() };
    if timeout > max {
        return Err(out_of_range());
    }
    i32::try_from(timeout.as_secs()).map_err(|_| out_of_range())
}

#[async_trait]
impl QueueClient for SqsQueueClient {
    async fn receive(&self, options: &ReceiveOptions) -> Result<Vec<QueueMessage>, QueueError> {
        self.ensure_open()?;
        let wait_time = timeout_secs("wait time", options.wait_time, MAX_WAIT_TIME)?;
        let visibility_timeout = options
            .visibility_timeout
            .map(|timeout| timeout_secs("visibility timeout", timeout, MAX_VISIBILITY_TIMEOUT))
            .transpose()?;

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(options.max_messages)
            .wait_time_seconds(wait_time)
            .set_visibility_timeout(visibility_timeout)
            .message_attribute_names("All")
            .send()
            .await?;

        let messages = output.messages.unwrap_or_default();
        debug!(queue_url = %self.queue_url, count = messages.len(), "Received messages from queue");

        Ok(into_queue_messages(messages))
    }

    async fn delete(&self, message: &QueueMessage) -> Result<(), QueueError> {
        self.ensure_open()?;

        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&message.receipt_handle)
            .send()
            .await?;

        debug!(queue_url = %self.queue_url, message_id = %message.message_id, "Deleted message");
        Ok(())
    }

    async fn change_visibility(&self, message: &QueueMessage, timeout: Duration) -> Result<(), QueueError> {
        self.ensure_open()?;
        let visibility_timeout = timeout_secs("visibility timeout", timeout, MAX_VISIBILITY_TIMEOUT)?;

        self.client
            .change_message_visibility()
            .queue_url(&self.queue_url)
            .receipt_handle(&message.receipt_handle)
            .visibility_timeout(visibility_timeout)
            .send()
            .await?;

        debug!(
            queue_url = %self.queue_url,
            message_id = %message.message_id,
            visibility_timeout_secs = timeout.as_secs(),
            "Changed message visibility"
        );
        Ok(())
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        self.ensure_open()?;

        self.client
            .get_queue_attributes()
            .queue_url(&self.queue_url)
            .attribute_names(QueueAttributeName::QueueArn)
            .send()
            .await?;
        Ok(())
    }

    async fn close(&self) {
        // The SDK client releases its connection pool on drop; closing only has to
        // stop further use through this handle.
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(queue_url = %self.queue_url, "SQS client closed");
        }
    }
}
