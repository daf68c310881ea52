//! Message queue access.
//!
//! The poller only needs to receive a batch and delete by receipt handle,
//! so the queue sits behind a small trait with an SQS implementation.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;
use tracing::{debug, info, instrument, warn};

use notification_core::{NotifyError, NotifyResult};

/// One received queue message.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub message_id: Option<String>,
    pub receipt_handle: String,
    pub body: String,
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Receive the next batch, blocking up to the configured wait time.
    async fn receive(&self) -> NotifyResult<Vec<QueueMessage>>;

    /// Delete a processed message.
    async fn delete(&self, receipt_handle: &str) -> NotifyResult<()>;
}

/// SQS settings for [`SqsQueue`].
#[derive(Debug, Clone)]
pub struct SqsSettings {
    pub queue_name: String,
    pub region: Option<String>,
    /// Long-poll wait (0..=20 seconds)
    pub wait_time_secs: i32,
    /// Batch size (1..=10)
    pub max_messages: i32,
}

/// An SQS queue looked up by name.
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    wait_time_secs: i32,
    max_messages: i32,
}

impl SqsQueue {
    /// Resolve the queue URL from its name using the default credential
    /// chain.
    pub async fn connect(settings: &SqsSettings) -> NotifyResult<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let aws_config = loader.load().await;
        let client = Client::new(&aws_config);

        let output = client
            .get_queue_url()
            .queue_name(&settings.queue_name)
            .send()
            .await
            .map_err(|e| {
                NotifyError::Queue(format!(
                    "Failed to look up queue {}: {}",
                    settings.queue_name,
                    DisplayErrorContext(&e)
                ))
            })?;

        let queue_url = output
            .queue_url()
            .ok_or_else(|| NotifyError::Queue(format!("No URL for queue {}", settings.queue_name)))?
            .to_string();

        info!(queue = %settings.queue_name, url = %queue_url, "Connected to queue");

        Ok(Self {
            client,
            queue_url,
            wait_time_secs: settings.wait_time_secs,
            max_messages: settings.max_messages,
        })
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    #[instrument(skip(self))]
    async fn receive(&self) -> NotifyResult<Vec<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .wait_time_seconds(self.wait_time_secs)
            .max_number_of_messages(self.max_messages)
            .send()
            .await
            .map_err(|e| {
                NotifyError::Queue(format!("Receive failed: {}", DisplayErrorContext(&e)))
            })?;

        let messages = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| match (m.receipt_handle, m.body) {
                (Some(receipt_handle), Some(body)) => Some(QueueMessage {
                    message_id: m.message_id,
                    receipt_handle,
                    body,
                }),
                _ => {
                    warn!(message_id = ?m.message_id, "Skipping message without body or receipt");
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(count = messages.len(), "Received messages");
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> NotifyResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| NotifyError::Queue(format!("Delete failed: {}", DisplayErrorContext(&e))))?;
        Ok(())
    }
}
