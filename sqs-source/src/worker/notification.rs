//! S3 event notifications delivered through SQS.
//!
//! S3 publishes one JSON document per notification with a `Records` array. When a
//! notification configuration is first attached to a bucket, S3 also sends a
//! `s3:TestEvent` document with a different shape, which carries no objects.

use crate::core::client::queue::QueueMessage;
use crate::error::ProcessingError;
use crate::worker::processor::MessageProcessor;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

const OBJECT_CREATED_PREFIX: &str = "ObjectCreated:";
const TEST_EVENT: &str = "s3:TestEvent";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum S3Notification {
    Records(S3EventNotification),
    Test(S3TestEvent),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct S3EventNotification {
    #[serde(rename = "Records")]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct S3EventRecord {
    pub event_name: String,
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub aws_region: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct S3Object {
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct S3TestEvent {
    #[serde(rename = "Event")]
    pub event: String,
    #[serde(rename = "Bucket", default)]
    pub bucket: Option<String>,
}

/// An object announced by an `ObjectCreated:*` record, with its key URL-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3ObjectReference {
    pub bucket: String,
    pub key: String,
    pub size: Option<u64>,
    pub region: Option<String>,
    pub event_time: Option<String>,
}

impl S3Notification {
    pub fn parse(body: &str) -> Result<Self, ProcessingError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Objects created by this notification. Test events and other event kinds yield nothing.
    pub fn created_objects(&self) -> Vec<S3ObjectReference> {
        match self {
            S3Notification::Test(_) => Vec::new(),
            S3Notification::Records(notification) => notification
                .records
                .iter()
                .filter(|record| record.event_name.starts_with(OBJECT_CREATED_PREFIX))
                .map(|record| S3ObjectReference {
                    bucket: record.s3.bucket.name.clone(),
                    key: decode_object_key(&record.s3.object.key),
                    size: record.s3.object.size,
                    region: record.aws_region.clone(),
                    event_time: record.event_time.clone(),
                })
                .collect(),
        }
    }

    pub fn is_test_event(&self) -> bool {
        matches!(self, S3Notification::Test(event) if event.event == TEST_EVENT)
    }
}

/// Object keys in S3 notifications are form-encoded: `+` is a space, `%XX` an escaped byte.
pub fn decode_object_key(raw: &str) -> String {
    url::form_urlencoded::parse(format!("key={raw}").as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| raw.to_string())
}

/// Downstream consumer of created objects.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectHandler: Send + Sync {
    async fn handle(&self, object: &S3ObjectReference) -> Result<(), ProcessingError>;
}

/// Logs every object; the default handler of the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObjectHandler;

#[async_trait]
impl ObjectHandler for LoggingObjectHandler {
    async fn handle(&self, object: &S3ObjectReference) -> Result<(), ProcessingError> {
        info!(bucket = %object.bucket, key = %object.key, size = ?object.size, "Object created");
        Ok(())
    }
}

/// [`MessageProcessor`] for queues subscribed to S3 event notifications.
///
/// Objects are handed to the handler in record order. The first handler failure fails
/// the whole message, so a redelivery replays every object of that notification.
pub struct S3EventProcessor {
    handler: Arc<dyn ObjectHandler>,
}

impl S3EventProcessor {
    pub fn new(handler: Arc<dyn ObjectHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl MessageProcessor for S3EventProcessor {
    async fn process(&self, message: &QueueMessage) -> Result<(), ProcessingError> {
        let notification = S3Notification::parse(&message.body)?;

        if notification.is_test_event() {
            debug!(message_id = %message.message_id, "Skipping S3 test event");
            return Ok(());
        }

        let objects = notification.created_objects();
        if objects.is_empty() {
            debug!(message_id = %message.message_id, "Notification has no created objects");
        }

        for object in &objects {
            self.handler.handle(object).await?;
        }
        Ok(())
    }
}
