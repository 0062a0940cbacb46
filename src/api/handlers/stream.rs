use axum::{
    extract::{ws::{Message, WebSocket}, State, WebSocketUpgrade},
    http::HeaderMap,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::info;

use crate::api::extractors::actor::AuthActor;
use crate::domain::models::actor::Actor;
use crate::error::AppError;
use crate::state::AppState;

/// Upgrades to a websocket that receives push events for the actor. The
/// session id scopes delivery to this connection; each event is sent at most
/// once, reconnecting clients catch up through the regular read endpoints.
pub async fn stream(
    ws: WebSocketUpgrade,
    AuthActor(actor): AuthActor,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::Validation("missing x-session-id header".into()))?
        .to_string();

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, session_id, actor, state)))
}

async fn handle_socket(socket: WebSocket, session_id: String, actor: Actor, state: Arc<AppState>) {
    let mut rx = state.push_registry.register(session_id.clone(), actor.id.clone()).await;
    info!("stream: session '{}' connected for actor '{}'", session_id, actor.id);

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.push_registry.unregister(&session_id).await;
    info!("stream: session '{}' disconnected", session_id);
}
