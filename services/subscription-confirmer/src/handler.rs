//! SQS event handling.

use aws_lambda_events::event::sqs::SqsEvent;
use lambda_runtime::{Error, LambdaEvent};
use tracing::{error, info};

use notification_core::{Envelope, MessageType, NotifyResult, SubscriptionConfirmer};

/// Per-invocation tally.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvocationSummary {
    pub confirmed: usize,
    pub ignored: usize,
    pub failed: usize,
}

enum RecordOutcome {
    Confirmed,
    Ignored,
}

/// Lambda entry point. Fails the invocation if any record failed.
pub async fn function_handler<C: SubscriptionConfirmer>(
    confirmer: &C,
    event: LambdaEvent<SqsEvent>,
) -> Result<(), Error> {
    let request_id = event.context.request_id.clone();
    let summary = handle_event(confirmer, &event.payload).await;

    info!(
        request_id = %request_id,
        confirmed = summary.confirmed,
        ignored = summary.ignored,
        failed = summary.failed,
        "Invocation complete"
    );

    if summary.failed > 0 {
        return Err(format!(
            "{} of {} records failed",
            summary.failed,
            event.payload.records.len()
        )
        .into());
    }
    Ok(())
}

/// Confirm every subscription confirmation record in the batch.
pub async fn handle_event<C: SubscriptionConfirmer>(
    confirmer: &C,
    event: &SqsEvent,
) -> InvocationSummary {
    let mut summary = InvocationSummary::default();

    for record in &event.records {
        let message_id = record.message_id.as_deref().unwrap_or("-");
        let body = record.body.as_deref().unwrap_or_default();

        match handle_record(confirmer, body).await {
            Ok(RecordOutcome::Confirmed) => {
                info!(message_id, "Subscription confirmed");
                summary.confirmed += 1;
            }
            Ok(RecordOutcome::Ignored) => summary.ignored += 1,
            Err(e) => {
                error!(message_id, kind = e.kind(), error = %e, "Record failed");
                summary.failed += 1;
            }
        }
    }

    summary
}

async fn handle_record<C: SubscriptionConfirmer>(
    confirmer: &C,
    body: &str,
) -> NotifyResult<RecordOutcome> {
    let envelope = Envelope::parse(body)?;
    match envelope.kind() {
        Some(MessageType::SubscriptionConfirmation) => {
            confirmer.confirm(envelope.subscribe_url()?).await?;
            Ok(RecordOutcome::Confirmed)
        }
        _ => Ok(RecordOutcome::Ignored),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use notification_core::HttpConfirmer;
    use serde_json::json;
    use test_utils::{confirmation_envelope, diagnostic_envelope, StubRoute, StubServer};

    fn sqs_event(bodies: &[String]) -> SqsEvent {
        let records: Vec<_> = bodies
            .iter()
            .enumerate()
            .map(|(i, body)| {
                json!({
                    "messageId": format!("msg-{}", i),
                    "receiptHandle": format!("receipt-{}", i),
                    "body": body,
                    "attributes": {},
                    "messageAttributes": {},
                    "eventSource": "aws:sqs",
                    "awsRegion": "eu-west-2",
                })
            })
            .collect();
        serde_json::from_value(json!({ "Records": records })).unwrap()
    }

    fn confirmer() -> HttpConfirmer {
        HttpConfirmer::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_confirms_every_confirmation_record() {
        let server = StubServer::start(vec![
            StubRoute::ok("/confirm/a", "ok"),
            StubRoute::ok("/confirm/b", "ok"),
        ])
        .await;
        let event = sqs_event(&[
            confirmation_envelope(&server.url("/confirm/a")),
            confirmation_envelope(&server.url("/confirm/b")),
        ]);

        let summary = handle_event(&confirmer(), &event).await;

        assert_eq!(summary.confirmed, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(server.hits("/confirm/a"), 1);
        assert_eq!(server.hits("/confirm/b"), 1);
    }

    #[tokio::test]
    async fn test_notifications_are_ignored() {
        let server = StubServer::start(vec![StubRoute::ok("/a.nc", b"a")]).await;
        let event = sqs_event(&[diagnostic_envelope(
            &server.url("/a.nc"),
            "surface_temperature",
            6,
        )]);

        let summary = handle_event(&confirmer(), &event).await;

        assert_eq!(
            summary,
            InvocationSummary {
                ignored: 1,
                ..Default::default()
            }
        );
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_records() {
        let server = StubServer::start(vec![StubRoute::ok("/confirm/b", "ok")]).await;
        let event = sqs_event(&[
            "not json".to_string(),
            confirmation_envelope(&server.url("/confirm/a")),
            confirmation_envelope(&server.url("/confirm/b")),
        ]);

        let summary = handle_event(&confirmer(), &event).await;

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.confirmed, 1);
        assert_eq!(server.hits("/confirm/b"), 1);
    }
}
