use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::domain::models::event::BookingEvent;
use crate::domain::ports::PushChannel;
use crate::error::AppError;

// Bounded per-session buffer; a slow consumer loses messages rather than
// stalling the publisher (delivery is at-most-once anyway).
const SESSION_BUFFER: usize = 32;

struct SessionHandle {
    actor_id: String,
    tx: mpsc::Sender<String>,
}

/// Session registry backing the websocket stream endpoint. Sessions register
/// on upgrade and are dropped on disconnect; publishing to a vanished or full
/// session fails without affecting the caller's transition.
pub struct InProcessPushChannel {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl InProcessPushChannel {
    pub fn new() -> Self {
        Self { sessions: RwLock::new(HashMap::new()) }
    }

    /// Registers a session and hands back the receiving end for the socket's
    /// send loop. A reconnect with the same session id replaces the old
    /// handle, which closes the previous socket's stream.
    pub async fn register(&self, session_id: String, actor_id: String) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, SessionHandle { actor_id, tx });
        rx
    }

    pub async fn unregister(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(session_id).is_some() {
            debug!(session_id = %session_id, "Push session unregistered");
        }
    }
}

impl Default for InProcessPushChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushChannel for InProcessPushChannel {
    async fn sessions_for(&self, actor_id: &str) -> Vec<String> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|(_, handle)| handle.actor_id == actor_id)
            .map(|(id, _)| id.clone())
            .collect()
    }

    async fn publish(&self, session_id: &str, event: &BookingEvent) -> Result<(), AppError> {
        let json = serde_json::to_string(event)
            .map_err(|e| AppError::InternalWithMsg(format!("event serialization failed: {}", e)))?;

        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(session_id)
            .ok_or_else(|| AppError::NotFound(format!("session '{}' is not connected", session_id)))?;

        // try_send keeps delivery at-most-once: no queueing behind a dead or
        // saturated connection.
        handle.tx.try_send(json).map_err(|e| {
            AppError::InternalWithMsg(format!("push to session '{}' failed: {}", session_id, e))
        })
    }
}
