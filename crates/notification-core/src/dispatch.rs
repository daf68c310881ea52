//! Per-message dispatch.
//!
//! Every received message moves from `Received` to exactly one terminal
//! [`Outcome`]: a handled subscription handshake, a handled notification
//! (fetched or filtered out) or an ignored message type.

use std::path::PathBuf;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, instrument};

use crate::confirm::SubscriptionConfirmer;
use crate::error::NotifyResult;
use crate::fetch::ObjectFetcher;
use crate::filter::FilterCriteria;
use crate::notification::{Envelope, MessageType, Notification};

/// Terminal state of one dispatched message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    ConfirmationHandled,
    NotificationHandled {
        url: String,
        /// Local path when the notification passed the filter.
        fetched: Option<PathBuf>,
    },
    Ignored {
        message_type: Option<String>,
    },
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Outcome::ConfirmationHandled => "confirmed",
            Outcome::NotificationHandled {
                fetched: Some(_), ..
            } => "fetched",
            Outcome::NotificationHandled { fetched: None, .. } => "filtered",
            Outcome::Ignored { .. } => "ignored",
        }
    }
}

/// Sees every decoded notification before it is filtered.
pub trait NotificationObserver: Send + Sync {
    fn observe(&self, notification: &Notification) -> NotifyResult<()>;
}

/// Routes envelopes to the handshake or to filter-then-fetch.
pub struct Dispatcher<F, C> {
    criteria: FilterCriteria,
    fetcher: F,
    confirmer: C,
    observer: Option<Arc<dyn NotificationObserver>>,
    verbose: bool,
}

impl<F, C> Dispatcher<F, C>
where
    F: ObjectFetcher,
    C: SubscriptionConfirmer,
{
    pub fn new(criteria: FilterCriteria, fetcher: F, confirmer: C) -> Self {
        Self {
            criteria,
            fetcher,
            confirmer,
            observer: None,
            verbose: false,
        }
    }

    /// Log every decoded payload at debug level.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn NotificationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Dispatch a raw envelope body.
    ///
    /// `type_hint` is an out-of-band discriminator (the webhook's
    /// `x-amz-sns-message-type` header); when present it takes precedence
    /// over the envelope's own `Type`.
    #[instrument(skip(self, body))]
    pub async fn dispatch(&self, body: &str, type_hint: Option<&str>) -> NotifyResult<Outcome> {
        let envelope = Envelope::parse(body)?;
        self.dispatch_envelope(&envelope, type_hint).await
    }

    pub async fn dispatch_envelope(
        &self,
        envelope: &Envelope,
        type_hint: Option<&str>,
    ) -> NotifyResult<Outcome> {
        if self.verbose {
            debug!(?envelope, "Received envelope");
        }

        let message_type = type_hint.map(MessageType::from).or_else(|| envelope.kind());

        let outcome = match message_type {
            Some(MessageType::SubscriptionConfirmation) => {
                self.confirmer.confirm(envelope.subscribe_url()?).await?;
                Outcome::ConfirmationHandled
            }
            Some(MessageType::Notification) => {
                let notification = envelope.notification()?;
                self.dispatch_notification(&notification).await?
            }
            other => {
                let message_type = other.map(|t| t.to_string());
                debug!(message_type = ?message_type, "Ignoring message");
                Outcome::Ignored { message_type }
            }
        };

        counter!("messages_dispatched_total", "outcome" => outcome.label()).increment(1);
        Ok(outcome)
    }

    /// Filter an already-decoded notification and fetch it if accepted.
    pub async fn dispatch_notification(&self, notification: &Notification) -> NotifyResult<Outcome> {
        if self.verbose {
            debug!(?notification, "Received notification");
        }

        if let Some(observer) = &self.observer {
            observer.observe(notification)?;
        }

        if !self.criteria.matches(&notification.metadata)? {
            debug!(
                url = %notification.url,
                name = ?notification.metadata.name(),
                forecast_period = ?notification.metadata.get("forecast_period"),
                "Notification filtered out"
            );
            return Ok(Outcome::NotificationHandled {
                url: notification.url.clone(),
                fetched: None,
            });
        }

        info!(url = %notification.url, "Notification matched filter");
        let path = self.fetcher.fetch(&notification.url).await?;

        Ok(Outcome::NotificationHandled {
            url: notification.url.clone(),
            fetched: Some(path),
        })
    }
}
