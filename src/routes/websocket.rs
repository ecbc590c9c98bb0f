use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, info, warn};

use crate::AppState;

/// GET /ws — live store changes for open screens
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    info!("WebSocket connected");

    // Both stores publish on the shared bus.
    let mut events = BroadcastStream::new(state.events.subscribe());

    // Store events → WebSocket
    let mut events_task = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!("WebSocket client lagging, skipped {} event(s)", skipped);
                    continue;
                }
            };
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Failed to encode store event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // The client only ever closes; anything else is ignored.
    let mut client_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                Message::Text(text) => debug!("Ignoring WS message: {}", text.as_str()),
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut events_task) => client_task.abort(),
        _ = (&mut client_task) => events_task.abort(),
    }

    info!("WebSocket disconnected");
}
