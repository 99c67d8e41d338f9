use crate::commands::SharedGallery;
use crate::services::live::LiveEvent;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

pub async fn live_updates(ws: WebSocketUpgrade, State(gallery): State<SharedGallery>) -> Response {
    let events = gallery.subscribe();
    ws.on_upgrade(move |socket| forward_events(socket, events))
}

async fn forward_events(mut socket: WebSocket, mut events: broadcast::Receiver<LiveEvent>) {
    info!("Client connected");

    loop {
        tokio::select! {
            received = events.recv() => {
                let event = match received {
                    Ok(event) => event,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Live client fell behind by {} events, asking it to refresh", missed);
                        LiveEvent::Refresh
                    }
                    Err(RecvError::Closed) => break,
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode live event: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Clients never send anything meaningful
                Some(Ok(_)) => {}
            },
        }
    }

    info!("Client disconnected");
}
