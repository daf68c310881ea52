//! Object notification queue downloader.
//!
//! Polls an SQS queue subscribed to an SNS topic with:
//! - Envelope unwrapping and subscription confirmation
//! - Forecast-period and diagnostic filtering
//! - Authenticated streamed downloads
//! - A CSV catalog of every notification seen

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, warn};

use notification_core::telemetry::init_tracing;
use notification_core::{DiagnosticCatalog, Dispatcher, HttpConfirmer, HttpFetcher};
use queue_downloader::poller::is_fatal;
use queue_downloader::{Args, Poller, SqsQueue};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_tracing(&args.log_level, args.verbose)?;

    info!(queue = %args.queue_name, "Starting queue downloader");

    let criteria = args.criteria()?;
    let fetcher = HttpFetcher::new(args.fetch_config())?;
    let confirmer = HttpConfirmer::new(args.request_timeout())?;

    let mut dispatcher = Dispatcher::new(criteria, fetcher, confirmer).verbose(args.verbose);
    if !args.no_catalog {
        let catalog = DiagnosticCatalog::create(&args.catalog_dir, &args.queue_name)?;
        dispatcher = dispatcher.with_observer(Arc::new(catalog));
    }

    let queue = SqsQueue::connect(&args.sqs_settings()).await?;
    let poller = Poller::new(queue, dispatcher, args.keep);

    if args.once {
        // Single run mode
        info!("Running single receive cycle");
        match poller.poll_once().await {
            Ok(stats) => info!(?stats, "Receive cycle complete"),
            Err(e) if is_fatal(&e) => return Err(e.into()),
            Err(e) => warn!(kind = e.kind(), error = %e, "Receive cycle failed"),
        }
    } else {
        // Continuous polling mode
        info!("Starting continuous polling");

        // Handle Ctrl+C
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            shutdown_tx.send(()).ok();
        });

        poller.run_forever(shutdown_rx).await?;
    }

    Ok(())
}
