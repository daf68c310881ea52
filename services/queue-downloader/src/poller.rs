//! Queue poll loop.
//!
//! Messages are processed one at a time. A failure on one message never
//! stops the loop unless its error kind calls for a halt; receive failures
//! are logged and polling resumes after a pause.

use std::time::Duration;

use metrics::counter;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use notification_core::{
    Dispatcher, NotifyError, NotifyResult, ObjectFetcher, Outcome, PollAction,
    SubscriptionConfirmer,
};

use crate::queue::{MessageQueue, QueueMessage};

/// Counts for one receive cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub received: usize,
    pub fetched: usize,
    pub filtered: usize,
    pub confirmed: usize,
    pub ignored: usize,
    pub discarded: usize,
    pub retained: usize,
}

impl CycleStats {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::ConfirmationHandled => self.confirmed += 1,
            Outcome::NotificationHandled {
                fetched: Some(_), ..
            } => self.fetched += 1,
            Outcome::NotificationHandled { fetched: None, .. } => self.filtered += 1,
            Outcome::Ignored { .. } => self.ignored += 1,
        }
    }
}

pub struct Poller<Q, F, C> {
    queue: Q,
    dispatcher: Dispatcher<F, C>,
    /// Leave processed messages on the queue
    keep_messages: bool,
    /// Pause after a failed receive
    retry_delay: Duration,
}

impl<Q, F, C> Poller<Q, F, C>
where
    Q: MessageQueue,
    F: ObjectFetcher,
    C: SubscriptionConfirmer,
{
    pub fn new(queue: Q, dispatcher: Dispatcher<F, C>, keep_messages: bool) -> Self {
        Self {
            queue,
            dispatcher,
            keep_messages,
            retry_delay: Duration::from_secs(20),
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Receive one batch and process every message in it.
    ///
    /// Returns an error for a failed receive or for a message whose error
    /// kind halts polling.
    pub async fn poll_once(&self) -> NotifyResult<CycleStats> {
        let messages = self.queue.receive().await?;
        let mut stats = CycleStats {
            received: messages.len(),
            ..Default::default()
        };
        counter!("queue_messages_received_total").increment(messages.len() as u64);

        for message in &messages {
            match self.dispatcher.dispatch(&message.body, None).await {
                Ok(outcome) => {
                    stats.record(&outcome);
                    self.acknowledge(message).await;
                }
                Err(e) => match e.poll_action() {
                    PollAction::Discard => {
                        warn!(
                            message_id = ?message.message_id,
                            kind = e.kind(),
                            error = %e,
                            "Discarding unprocessable message"
                        );
                        stats.discarded += 1;
                        self.acknowledge(message).await;
                    }
                    PollAction::Retain => {
                        warn!(
                            message_id = ?message.message_id,
                            kind = e.kind(),
                            error = %e,
                            "Message processing failed, leaving on queue"
                        );
                        stats.retained += 1;
                    }
                    PollAction::Halt => {
                        error!(
                            message_id = ?message.message_id,
                            kind = e.kind(),
                            error = %e,
                            "Message processing failed, halting"
                        );
                        return Err(e);
                    }
                },
            }
        }

        Ok(stats)
    }

    /// Poll until shutdown is signalled or a halting error occurs.
    pub async fn run_forever(&self, mut shutdown: broadcast::Receiver<()>) -> NotifyResult<()> {
        loop {
            info!("Checking queue for messages");

            let result = tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down poller");
                    return Ok(());
                }
                result = self.poll_once() => result,
            };

            match result {
                Ok(stats) => {
                    if stats.received > 0 {
                        info!(
                            received = stats.received,
                            fetched = stats.fetched,
                            filtered = stats.filtered,
                            confirmed = stats.confirmed,
                            ignored = stats.ignored,
                            discarded = stats.discarded,
                            retained = stats.retained,
                            "Processed messages"
                        );
                    }
                }
                Err(e) if e.poll_action() == PollAction::Halt => return Err(e),
                Err(e) => {
                    counter!("queue_receive_failures_total").increment(1);
                    warn!(
                        kind = e.kind(),
                        error = %e,
                        delay_secs = self.retry_delay.as_secs(),
                        "Polling failed, retrying"
                    );
                    tokio::select! {
                        _ = shutdown.recv() => {
                            info!("Shutting down poller");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }
    }

    async fn acknowledge(&self, message: &QueueMessage) {
        if self.keep_messages {
            debug!(message_id = ?message.message_id, "Keeping message on queue");
            return;
        }
        if let Err(e) = self.queue.delete(&message.receipt_handle).await {
            warn!(
                message_id = ?message.message_id,
                error = %e,
                "Failed to delete message"
            );
        }
    }
}

/// Exit status helper for the binary: halting errors are fatal.
pub fn is_fatal(err: &NotifyError) -> bool {
    err.poll_action() == PollAction::Halt
}
