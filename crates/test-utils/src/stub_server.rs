//! Stub HTTP server for exercising download and confirmation requests.
//!
//! The server binds an ephemeral port on localhost, answers each path from
//! a fixed table and records every request it sees. Unknown paths get 404.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A canned response for one path.
#[derive(Debug, Clone)]
pub struct StubRoute {
    pub path: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl StubRoute {
    /// 200 with the given body.
    pub fn ok(path: &str, body: impl AsRef<[u8]>) -> Self {
        Self::status(path, 200, body)
    }

    pub fn status(path: &str, status: u16, body: impl AsRef<[u8]>) -> Self {
        Self {
            path: path.to_string(),
            status,
            body: body.as_ref().to_vec(),
        }
    }
}

/// One request seen by the stub.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path plus query string
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

#[derive(Clone)]
struct StubState {
    routes: Arc<HashMap<String, StubRoute>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Handle for a running stub server. Shuts down on drop.
pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StubServer {
    /// Start serving `routes` on an ephemeral localhost port.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(routes: Vec<StubRoute>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind stub server");
        let addr = listener.local_addr().expect("stub server has no address");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            routes: Arc::new(routes.into_iter().map(|r| (r.path.clone(), r)).collect()),
            requests: requests.clone(),
        };

        let app = Router::new().fallback(respond).with_state(state);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .ok();
        });

        Self {
            addr,
            requests,
            shutdown: Some(shutdown_tx),
        }
    }

    /// Absolute URL for a path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Requests captured so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map_or_else(|_| Vec::new(), |entries| entries.clone())
    }

    /// Number of requests made to `path` (query string ignored).
    pub fn hits(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path.split('?').next() == Some(path))
            .count()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
    }
}

async fn respond(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = RecordedRequest {
        method: method.to_string(),
        path: uri
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        headers: headers
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect(),
        body: body.to_vec(),
    };
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(recorded);
    }

    match state.routes.get(uri.path()) {
        Some(route) => {
            let status = StatusCode::from_u16(route.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, route.body.clone()).into_response()
        }
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}
