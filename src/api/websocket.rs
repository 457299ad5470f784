// SPDX-License-Identifier: GPL-3.0-only
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::events::{BroadcastSink, EngineEvent};

/// `GET /ws`: pushes every engine event to the client as JSON.
pub fn router(events: BroadcastSink) -> Router {
    Router::new().route(
        "/ws",
        get(move |ws: WebSocketUpgrade| async move {
            let subscription = events.subscribe();
            ws.on_upgrade(move |socket| handle_socket(socket, subscription))
        }),
    )
}

async fn handle_socket(socket: WebSocket, mut events: broadcast::Receiver<EngineEvent>) {
    info!("WebSocket client connected");
    let (sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut send_task = tokio::spawn(async move {
        let mut sender = sender;
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(msg).await {
                error!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    let event_tx = tx.clone();
    let mut event_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match encode(&event) {
                    Some(msg) => {
                        debug!(app_id = ?event.app_id(), "Pushing event to WebSocket client");
                        if event_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    None => continue,
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "WebSocket client lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Ping(payload) => {
                    if tx.send(Message::Pong(payload)).is_err() {
                        break;
                    }
                }
                Message::Close(_) => {
                    info!("WebSocket connection closed");
                    break;
                }
                other => debug!(?other, "Ignoring client WebSocket message"),
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
            event_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
            event_task.abort();
        }
        _ = (&mut event_task) => {
            send_task.abort();
            recv_task.abort();
        }
    };
}

fn encode(event: &EngineEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            error!(error = %e, "Failed to encode engine event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleState;
    use crate::models::ApplicationId;

    #[test]
    fn test_events_encode_as_tagged_json() {
        let event = EngineEvent::state_changed(ApplicationId::new("a"), None, LifecycleState::NotInstalled);
        let Some(Message::Text(text)) = encode(&event) else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "state_changed");
        assert!(value["old_state"].is_null());
        assert_eq!(value["new_state"]["state"], "not_installed");
    }
}
