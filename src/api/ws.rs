use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use log::debug;
use tokio::{select, sync::broadcast::error::RecvError};

use crate::api::routes::AppState;
use crate::publisher::EngineEvent;

// WebSocket handler - accepts upgrade and handles the connection
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_event(socket: &mut WebSocket, event: &EngineEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        // Serialization of our own types should not fail; skip the frame rather than drop the client
        Err(_) => true,
    }
}

// One subscriber: full state dump first, then every engine event in order
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    // Subscribe before building the dump so nothing published in between is missed
    let mut events = state.engine.publisher().subscribe();
    let init = EngineEvent::Init(state.engine.init_payload().await);
    if !send_event(&mut socket, &init).await {
        return;
    }

    loop {
        select! {
            result = events.recv() => {
                match result {
                    Ok(event) => {
                        if !send_event(&mut socket, &event).await {
                            return;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Slow client: drop what it missed, later events supersede
                        debug!("Subscriber lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => return,
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    // Inbound frames carry no commands
                    _ => {}
                }
            }
        }
    }
}
