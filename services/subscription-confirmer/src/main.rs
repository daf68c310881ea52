//! Lambda function confirming SNS subscriptions that arrive through SQS.

mod handler;

use std::time::Duration;

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;

use aws_lambda_events::event::sqs::SqsEvent;
use notification_core::telemetry::parse_level;
use notification_core::HttpConfirmer;

/// Timeout for the confirmation GET.
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Error> {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .json()
        .with_max_level(parse_level(&level))
        .with_target(false)
        .without_time()
        .init();

    // Built once per cold start and reused across invocations
    let confirmer = HttpConfirmer::new(CONFIRM_TIMEOUT)?;
    let confirmer = &confirmer;

    info!("Subscription confirmer ready");

    run(service_fn(move |event: LambdaEvent<SqsEvent>| async move {
        handler::function_handler(confirmer, event).await
    }))
    .await
}
