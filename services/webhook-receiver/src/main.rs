//! Object notification webhook receiver.
//!
//! Serves a single delivery route for an SNS HTTP(S) subscription,
//! confirms the subscription handshake and downloads objects whose
//! metadata passes the configured filter.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use notification_core::telemetry::init_tracing;
use notification_core::{Dispatcher, HttpConfirmer, HttpFetcher};
use webhook_receiver::{start_server, Args, ServerState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_tracing(&args.log_level, args.verbose)?;

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Starting webhook receiver");

    let criteria = args.criteria()?;
    let fetcher = HttpFetcher::new(args.fetch_config())?;
    let confirmer = HttpConfirmer::new(args.request_timeout())?;
    let dispatcher = Dispatcher::new(criteria, fetcher, confirmer).verbose(args.verbose);

    let state = Arc::new(ServerState::new(dispatcher).with_prometheus(prometheus_handle));

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address: {}:{}", args.bind, args.port))?;

    start_server(state, addr).await
}
