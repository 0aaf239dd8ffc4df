use axum::{
    extract::{Extension, ws::{WebSocket, WebSocketUpgrade, Message}},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::dto::{cache_dto::RefreshSummary, mock_draft_dto::{MockDraftPick, MockDraftUpdate}};

fn broadcast_json<T: Serialize>(tx: &broadcast::Sender<String>, message: &T) {
    match serde_json::to_string(message) {
        Ok(json) => {
            // No subscribers is not an error.
            let _ = tx.send(json);
        }
        Err(e) => error!("Failed to serialize websocket message: {}", e),
    }
}

pub fn send_mock_draft_update(tx: &broadcast::Sender<String>, mock_draft_id: &str, pick: &MockDraftPick) {
    broadcast_json(
        tx,
        &MockDraftUpdate {
            r#type: "mock_draft_update",
            mock_draft_id,
            pick,
        },
    );
}

pub fn send_cache_update(tx: &broadcast::Sender<String>, results: &RefreshSummary) {
    broadcast_json(tx, &json!({ "type": "data_cache_update", "results": results }));
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Extension(tx): Extension<broadcast::Sender<String>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, tx))
}

async fn handle_socket(socket: WebSocket, tx: broadcast::Sender<String>) {
    info!("Websocket client connected.");
    let (mut sender, mut receiver) = socket.split();
    let mut rx = tx.subscribe();

    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    info!("Websocket client lagged, skipped {} messages", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Clients only listen; inbound frames are drained until close.
    while let Some(Ok(msg)) = receiver.next().await {
        if matches!(msg, Message::Close(_)) {
            break;
        }
    }

    send_task.abort();
    info!("Websocket client disconnected.");
}
