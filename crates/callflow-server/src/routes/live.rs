//! Live Event Stream
//!
//! Server -> Client (JSON), one message per event:
//! ```json
//! {"type": "call.digits", "data": {"call_id": "…", "digits": "1"}, "timestamp": "…"}
//! ```
//!
//! Observers that fall behind skip the missed events and keep receiving.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use crate::AppState;

/// WebSocket upgrade handler
pub async fn live_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut events = state.live.subscribe();
    tracing::info!("👀 Live observer connected");

    let sender_task = tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("⚠️  Live observer lagged, skipped {} events", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Failed to encode live event: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Observers are read-only; drain until the client leaves
    while let Some(Ok(msg)) = ws_receiver.next().await {
        if let Message::Close(_) = msg {
            break;
        }
    }

    sender_task.abort();
    tracing::info!("👋 Live observer disconnected");
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/live", get(live_handler))
}
