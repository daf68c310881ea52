//! HTTP server for the webhook receiver.
//!
//! Provides endpoints for:
//! - `GET|POST|PUT /` - SNS deliveries (handshakes and notifications)
//! - `GET /status` - Counters and recent deliveries
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use notification_core::{Dispatcher, HttpConfirmer, HttpFetcher, NotifyError, Outcome};

/// Header SNS uses to carry the message type.
pub const MESSAGE_TYPE_HEADER: &str = "x-amz-sns-message-type";

/// Body returned for every delivery.
pub const ACK_BODY: &str = "OK\n";

/// Shared state for the HTTP server.
pub struct ServerState {
    pub dispatcher: Dispatcher<HttpFetcher, HttpConfirmer>,
    pub tracker: DeliveryTracker,
    pub prometheus: Option<PrometheusHandle>,
}

impl ServerState {
    pub fn new(dispatcher: Dispatcher<HttpFetcher, HttpConfirmer>) -> Self {
        Self {
            dispatcher,
            tracker: DeliveryTracker::new(),
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

/// One handled delivery.
#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub received_at: DateTime<Utc>,
    pub message_type: Option<String>,
    pub result: String,
    pub url: Option<String>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

/// Running totals by result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryCounts {
    pub confirmed: u64,
    pub fetched: u64,
    pub filtered: u64,
    pub ignored: u64,
    pub failed: u64,
}

/// Tracking for recent deliveries.
pub struct DeliveryTracker {
    counts: Mutex<DeliveryCounts>,
    recent: Mutex<VecDeque<Delivery>>,
    max_recent: usize,
}

impl Default for DeliveryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryTracker {
    pub fn new() -> Self {
        Self {
            counts: Mutex::new(DeliveryCounts::default()),
            recent: Mutex::new(VecDeque::new()),
            max_recent: 100,
        }
    }

    pub async fn record_outcome(&self, message_type: Option<&str>, outcome: &Outcome) {
        let (result, url) = {
            let mut counts = self.counts.lock().await;
            match outcome {
                Outcome::ConfirmationHandled => {
                    counts.confirmed += 1;
                    ("confirmed", None)
                }
                Outcome::NotificationHandled {
                    url,
                    fetched: Some(_),
                } => {
                    counts.fetched += 1;
                    ("fetched", Some(url.clone()))
                }
                Outcome::NotificationHandled { url, fetched: None } => {
                    counts.filtered += 1;
                    ("filtered", Some(url.clone()))
                }
                Outcome::Ignored { .. } => {
                    counts.ignored += 1;
                    ("ignored", None)
                }
            }
        };

        self.push(Delivery {
            received_at: Utc::now(),
            message_type: message_type.map(str::to_string),
            result: result.to_string(),
            url,
            error_kind: None,
            error_message: None,
        })
        .await;
    }

    pub async fn record_error(&self, message_type: Option<&str>, err: &NotifyError) {
        self.counts.lock().await.failed += 1;
        self.push(Delivery {
            received_at: Utc::now(),
            message_type: message_type.map(str::to_string),
            result: "failed".to_string(),
            url: None,
            error_kind: Some(err.kind().to_string()),
            error_message: Some(err.to_string()),
        })
        .await;
    }

    async fn push(&self, delivery: Delivery) {
        let mut recent = self.recent.lock().await;
        recent.push_front(delivery);

        // Keep only recent entries
        while recent.len() > self.max_recent {
            recent.pop_back();
        }
    }

    pub async fn get_status(&self) -> StatusResponse {
        let counts = self.counts.lock().await.clone();
        let recent = self.recent.lock().await;

        StatusResponse {
            counts,
            recent: recent.iter().take(20).cloned().collect(),
        }
    }
}

/// Response for /status endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub counts: DeliveryCounts,
    pub recent: Vec<Delivery>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// GET|POST|PUT / - Handle an SNS delivery
///
/// SNS posts JSON with a `text/plain` content type, so the body is taken
/// as raw bytes. The response is always `200 OK`; failures are logged.
async fn delivery_handler(
    Extension(state): Extension<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let message_type = headers
        .get(MESSAGE_TYPE_HEADER)
        .and_then(|v| v.to_str().ok());
    let body = String::from_utf8_lossy(&body);

    // Production deployments should verify the SNS message signature here.

    match state.dispatcher.dispatch(&body, message_type).await {
        Ok(outcome) => {
            info!(message_type = ?message_type, ?outcome, "Handled delivery");
            state.tracker.record_outcome(message_type, &outcome).await;
        }
        Err(e) => {
            error!(
                message_type = ?message_type,
                kind = e.kind(),
                error = %e,
                "Delivery handling failed"
            );
            state.tracker.record_error(message_type, &e).await;
        }
    }

    ACK_BODY
}

/// GET /status - Counters and recent deliveries
async fn status_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    Json(state.tracker.get_status().await)
}

/// GET /health - Health check
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "webhook-receiver".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /metrics - Prometheus metrics
async fn metrics_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    state
        .prometheus
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Build the HTTP router.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(
            "/",
            get(delivery_handler)
                .post(delivery_handler)
                .put(delivery_handler),
        )
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

/// Start the HTTP server.
pub async fn start_server(state: Arc<ServerState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting webhook receiver");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
