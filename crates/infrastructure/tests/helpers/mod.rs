#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use dohproxy_domain::config::DohClientConfig;
use hickory_proto::op::{Message, MessageType, Query as DnsQuestion};
use hickory_proto::rr::{Name, RecordType};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub name: String,
    pub record_type: String,
    pub accept: String,
}

#[derive(Clone)]
struct MockState {
    body: Arc<RwLock<String>>,
    status: Arc<RwLock<StatusCode>>,
    delay: Arc<RwLock<Option<Duration>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

/// Local HTTP server answering `/resolve` the way a JSON DoH provider does.
pub struct MockDohServer {
    addr: SocketAddr,
    state: MockState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDohServer {
    pub async fn start() -> Self {
        let state = MockState {
            body: Arc::new(RwLock::new(r#"{"Status":0}"#.to_string())),
            status: Arc::new(RwLock::new(StatusCode::OK)),
            delay: Arc::new(RwLock::new(None)),
            seen: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/resolve", get(resolve))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/resolve", self.addr)
    }

    pub fn set_body(&self, body: &str) {
        *self.state.body.write().unwrap() = body.to_string();
    }

    pub fn set_status(&self, status: StatusCode) {
        *self.state.status.write().unwrap() = status;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.write().unwrap() = Some(delay);
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.state.seen.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for MockDohServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn resolve(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.seen.lock().unwrap().push(SeenRequest {
        name: params.get("name").cloned().unwrap_or_default(),
        record_type: params.get("type").cloned().unwrap_or_default(),
        accept: headers
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
    });

    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);

    let delay = *state.delay.read().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    let status = *state.status.read().unwrap();
    let body = state.body.read().unwrap().clone();
    (status, [(CONTENT_TYPE, "application/dns-json")], body)
}

// ── Builders ───────────────────────────────────────────────────────────────

pub fn client_config(url: String) -> DohClientConfig {
    DohClientConfig {
        url,
        max_concurrent_requests: 4,
        semaphore_acquire_timeout_milliseconds: 200,
        request_timeout_milliseconds: 2_000,
    }
}

pub fn query(id: u16, domain: &str, record_type: RecordType) -> Message {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_recursion_desired(true)
        .add_query(DnsQuestion::query(Name::from_ascii(domain).unwrap(), record_type));
    message
}
