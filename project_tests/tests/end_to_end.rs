//! Full pipeline: a local HTTP upstream, the real `HttpFetcher`, the polling
//! ingestor driven one cycle at a time, and WebSocket clients on the gateway.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};

use lib_pollcast::core::{CacheWriter, Dispatcher};
use lib_pollcast::gateway::{self, AppState};
use lib_pollcast::ingestors::{PollOutcome, PollingIngestor};
use lib_pollcast::retrieve::HttpFetcher;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What the stand-in upstream answers with.
type Upstream = Arc<Mutex<(StatusCode, Value)>>;

async fn upstream_handler(State(upstream): State<Upstream>) -> (StatusCode, Json<Value>) {
    let (status, body) = upstream.lock().unwrap().clone();
    (status, Json(body))
}

struct Harness {
    upstream: Upstream,
    ingestor: PollingIngestor<HttpFetcher>,
    dispatcher: Arc<Dispatcher>,
    gateway_addr: SocketAddr,
    _shutdown: broadcast::Sender<()>,
}

impl Harness {
    async fn start() -> Self {
        let upstream: Upstream = Arc::new(Mutex::new((StatusCode::OK, teams("t1", 2))));
        let upstream_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream_listener.local_addr().unwrap();
        let upstream_app = Router::new()
            .route("/api/teams", get(upstream_handler))
            .with_state(Arc::clone(&upstream));
        tokio::spawn(async move { axum::serve(upstream_listener, upstream_app).await });

        let writer = CacheWriter::new();
        let dispatcher = Arc::new(Dispatcher::new(writer.reader()));
        let fetcher = HttpFetcher::new(
            &format!("http://{}/api/teams", upstream_addr),
            Duration::from_secs(2),
            "PollCast-tests",
        )
        .unwrap();
        // The loop is never started; cycles are driven with `poll_once`.
        let ingestor = PollingIngestor::new(fetcher, writer, Arc::clone(&dispatcher), Duration::from_secs(5));

        let state = Arc::new(AppState {
            dispatcher: Arc::clone(&dispatcher),
            counters: ingestor.counters(),
        });
        let (shutdown, _) = broadcast::channel(1);
        let gateway_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let gateway_addr = gateway_listener.local_addr().unwrap();
        tokio::spawn(gateway::serve(gateway_listener, state, shutdown.subscribe()));

        Self {
            upstream,
            ingestor,
            dispatcher,
            gateway_addr,
            _shutdown: shutdown,
        }
    }

    fn set_upstream(&self, status: StatusCode, body: Value) {
        *self.upstream.lock().unwrap() = (status, body);
    }

    async fn connect(&self) -> Client {
        let (ws, _) = connect_async(format!("ws://{}/ws", self.gateway_addr)).await.unwrap();
        ws
    }

    async fn wait_for_clients(&self, expected: usize) {
        for _ in 0..100 {
            if self.dispatcher.client_count() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {} clients, have {}", expected, self.dispatcher.client_count());
    }
}

fn teams(marker: &str, nfl_rows: usize) -> Value {
    let nfl: Vec<Value> = (0..nfl_rows).map(|i| json!({ "id": i.to_string(), "name": format!("Team {}", i) })).collect();
    json!({
        "last_updated": marker,
        "NCAAB": [{ "id": "1", "name": "Blue Devils", "nickname": "DUKE" }],
        "NFL": nfl,
    })
}

async fn next_frame(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(3), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("socket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn assert_silent(client: &mut Client) {
    let quiet = tokio::time::timeout(Duration::from_millis(300), client.next()).await;
    assert!(quiet.is_err(), "unexpected frame: {:?}", quiet);
}

#[tokio::test]
async fn test_new_client_is_synced_with_cached_document() {
    let harness = Harness::start().await;
    assert!(matches!(harness.ingestor.poll_once().await, PollOutcome::Accepted(_)));

    let mut client = harness.connect().await;
    let frame = next_frame(&mut client).await;

    assert_eq!(frame["event"], "data_update");
    assert_eq!(frame["data"], teams("t1", 2));
}

#[tokio::test]
async fn test_connecting_to_empty_cache_waits_for_first_update() {
    let harness = Harness::start().await;
    let mut client = harness.connect().await;
    harness.wait_for_clients(1).await;
    assert_silent(&mut client).await;

    assert!(matches!(harness.ingestor.poll_once().await, PollOutcome::Accepted(_)));

    let frame = next_frame(&mut client).await;
    assert_eq!(frame["data"]["last_updated"], "t1");
}

#[tokio::test]
async fn test_changes_are_broadcast_and_repeats_are_not() {
    let harness = Harness::start().await;
    harness.ingestor.poll_once().await;

    let mut first = harness.connect().await;
    let mut second = harness.connect().await;
    harness.wait_for_clients(2).await;
    assert_eq!(next_frame(&mut first).await["data"]["last_updated"], "t1");
    assert_eq!(next_frame(&mut second).await["data"]["last_updated"], "t1");

    // Same marker, different payload: ignored.
    harness.set_upstream(StatusCode::OK, teams("t1", 5));
    assert_eq!(harness.ingestor.poll_once().await, PollOutcome::Unchanged);
    assert_silent(&mut first).await;

    harness.set_upstream(StatusCode::OK, teams("t2", 3));
    assert!(matches!(harness.ingestor.poll_once().await, PollOutcome::Accepted(_)));

    for client in [&mut first, &mut second] {
        let frame = next_frame(client).await;
        assert_eq!(frame["data"]["last_updated"], "t2");
        assert_eq!(frame["data"]["NFL"].as_array().map(Vec::len), Some(3));
    }
}

#[tokio::test]
async fn test_upstream_failure_keeps_serving_last_good_document() {
    let harness = Harness::start().await;
    harness.ingestor.poll_once().await;

    let mut watcher = harness.connect().await;
    next_frame(&mut watcher).await;

    harness.set_upstream(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "boom" }));
    assert!(matches!(harness.ingestor.poll_once().await, PollOutcome::Failed(_)));
    assert_silent(&mut watcher).await;

    let mut late = harness.connect().await;
    assert_eq!(next_frame(&mut late).await["data"]["last_updated"], "t1");
}

#[tokio::test]
async fn test_closed_clients_are_unregistered() {
    let harness = Harness::start().await;
    let mut leaving = harness.connect().await;
    let _staying = harness.connect().await;
    harness.wait_for_clients(2).await;

    leaving.send(Message::Close(None)).await.unwrap();
    drop(leaving);
    harness.wait_for_clients(1).await;

    // Broadcasts keep flowing to whoever is left.
    harness.ingestor.poll_once().await;
    assert_eq!(harness.dispatcher.client_count(), 1);
}

#[tokio::test]
async fn test_health_reports_clients_and_version() {
    let harness = Harness::start().await;
    harness.ingestor.poll_once().await;
    let _client = harness.connect().await;
    harness.wait_for_clients(1).await;

    let health: Value = reqwest::get(format!("http://{}/health", harness.gateway_addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(health["status"], "ok");
    assert_eq!(health["clients"], 1);
    let peers = health["peers"].as_array().unwrap();
    assert_eq!(peers.len(), 1);
    assert!(peers[0].as_str().unwrap().starts_with("127.0.0.1:"));
    assert_eq!(health["version"], "t1");
    assert_eq!(health["state"], "idle");
    assert_eq!(health["cycles"], 1);
    assert_eq!(health["accepted"], 1);
}
