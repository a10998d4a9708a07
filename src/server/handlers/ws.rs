//! Live update socket.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};

use super::super::AppState;
use crate::hub::{BroadcastHub, Subscription};

pub async fn websocket(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| forward_notifications(socket, state.hub))
}

/// Relay hub messages to the socket until either side goes away.
async fn forward_notifications(socket: WebSocket, hub: BroadcastHub) {
    let Subscription { id, mut receiver } = hub.subscribe();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            message = receiver.recv() => {
                // None: the hub already dropped this subscriber.
                let Some(message) = message else { break };
                if sink.send(Message::Text(message.to_string())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    hub.unsubscribe(id);
}
