use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::AppState;

/// WebSocket handler for the live placement feed
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading the board so no placement falls in between
    let mut update_rx = state.feed.subscribe();

    // Send the current board to the client
    let overview = match serde_json::to_string(&state.board.overview()) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to encode board overview: {}", e);
            return;
        }
    };
    if let Err(e) = sender.send(Message::Text(overview.into())).await {
        tracing::error!("Failed to send initial state: {}", e);
        return;
    }
    tracing::debug!(%connection_id, "live feed connected");

    // Forward placements to this client
    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match update_rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%connection_id, skipped, "live feed subscriber lagging");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to encode pixel event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // The feed is one-way; only watch for the client going away
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    tracing::debug!(%connection_id, "live feed closed");
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ws/pixel-canvas", get(ws_handler))
}
