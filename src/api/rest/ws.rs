use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::models::events::OrderEvent;
use crate::sim::TrackingSnapshot;
use crate::state::AppState;

/// One message on the live feed: either a per-tick tracking snapshot or
/// a timeline event, tagged so the display side can tell them apart.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum FeedMessage {
    Snapshot(TrackingSnapshot),
    TimelineEvent(OrderEvent),
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut snapshots_rx = state.snapshots_tx.subscribe();
    let mut events_rx = state.order_events_tx.subscribe();

    info!("websocket client connected");

    let send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                snapshot = snapshots_rx.recv() => match snapshot {
                    Ok(snapshot) => FeedMessage::Snapshot(snapshot),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
                event = events_rx.recv() => match event {
                    Ok(event) => FeedMessage::TimelineEvent(event),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
            };

            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize feed message");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("websocket client disconnected");
}
