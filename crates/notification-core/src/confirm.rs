//! Subscription confirmation handshake.
//!
//! A newly registered endpoint receives no notifications until it fetches
//! the `SubscribeURL` from the handshake message. There is no retry here;
//! a failed handshake is reported to the caller.

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::{Client, StatusCode};
use tracing::{info, instrument};

use crate::error::{NotifyError, NotifyResult};

#[async_trait]
pub trait SubscriptionConfirmer: Send + Sync {
    /// Visit the confirmation URL. Only HTTP 200 counts as confirmed.
    async fn confirm(&self, confirmation_url: &str) -> NotifyResult<()>;
}

/// Confirms subscriptions with a plain HTTP GET.
pub struct HttpConfirmer {
    client: Client,
}

impl HttpConfirmer {
    pub fn new(request_timeout: Duration) -> NotifyResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| NotifyError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SubscriptionConfirmer for HttpConfirmer {
    #[instrument(skip(self))]
    async fn confirm(&self, confirmation_url: &str) -> NotifyResult<()> {
        let response = self.client.get(confirmation_url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            counter!("subscription_confirmation_failures_total").increment(1);
            return Err(NotifyError::Confirmation {
                status: status.as_u16(),
            });
        }

        counter!("subscription_confirmations_total").increment(1);
        info!("Subscription confirmation has been confirmed");
        Ok(())
    }
}
