//! # Downstream Server
//!
//! Each accepted WebSocket gets its own task. The task registers with the
//! `Dispatcher` (which syncs it to the cached snapshot straight away), then
//! forwards every queued snapshot as a `data_update` text frame until either
//! side goes away. On exit the client is unregistered.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::core::dispatcher::Dispatcher;
use crate::gateway::model::{HealthReport, ServerEvent};
use crate::ingestors::poll_loop::PollCounters;

/// # Application State
///
/// Shared by every route handler.
pub struct AppState {
    /// Registers clients and fans snapshots out to them.
    pub dispatcher: Arc<Dispatcher>,
    /// Live counters of the polling ingestor, for `/health`.
    pub counters: Arc<PollCounters>,
}

/// Builds the router with `/ws`, `/health` and a permissive CORS layer.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

/// Serves the router on `listener` until `shutdown` fires or its sender is dropped.
///
/// # Errors
/// Returns the I/O error if the server fails while serving.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let app = build_router(state);
    if let Ok(addr) = listener.local_addr() {
        log::info!("Downstream server listening on {}", addr);
    }

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            shutdown.recv().await.ok();
            log::info!("Downstream server shutting down.");
        })
        .await
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let peers = state.dispatcher.client_labels();
    Json(HealthReport {
        status: "ok",
        clients: peers.len(),
        peers,
        version: state.dispatcher.cache().version(),
        state: state.counters.state(),
        stats: state.counters.stats(),
    })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

/// # WebSocket Connection Logic
///
/// 1.  Registers with the dispatcher; the cached snapshot (if any) is already
///     queued when `connect` returns.
/// 2.  Forwards queued snapshots as `data_update` frames.
/// 3.  Answers pings, ignores other client frames, stops on close or error.
/// 4.  Unregisters on the way out.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, addr: SocketAddr) {
    let (client_id, mut rx) = state.dispatcher.connect(&addr.to_string());

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(snapshot) = frame else { break };
                let text = match ServerEvent::data_update(&snapshot).to_text() {
                    Ok(text) => text,
                    Err(e) => {
                        log::warn!("Failed to encode version {}: {}", snapshot.version(), e);
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    log::debug!("Client {} send failed", client_id);
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        log::debug!("Client {} socket error: {}", client_id, e);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.dispatcher.disconnect(client_id);
    log::info!("Client {} ({}) disconnected", client_id, addr);
}
