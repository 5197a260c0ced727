//! WebSocket session management for interactive segment edits.
//!
//! Each session reads JSON [`ClientCommand`]s, applies them to the control
//! context and answers with the resulting state.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::server::state::{AppState, ClientCommand, StateSnapshot};

type SessionError = Box<dyn std::error::Error + Send + Sync>;

/// Response messages sent to clients
#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionResponse {
    State {
        changed: bool,
        #[serde(flatten)]
        state: StateSnapshot,
    },
    Error {
        message: String,
    },
}

/// WebSocket session manager
pub struct WebSocketSession {
    socket: WebSocket,
    state: AppState,
    session_id: String,
}

impl WebSocketSession {
    pub fn new(socket: WebSocket, state: AppState, session_id: String) -> Self {
        Self {
            socket,
            state,
            session_id,
        }
    }

    /// Handle the WebSocket connection lifecycle
    pub async fn handle(mut self) {
        info!("WebSocket session {} established", self.session_id);

        if let Err(e) = self.send_state(false).await {
            error!("Failed to send initial state to {}: {}", self.session_id, e);
            return;
        }

        while let Some(msg) = self.socket.recv().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(e) = self.handle_text_message(&text).await {
                        error!("Error handling message from {}: {}", self.session_id, e);
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("WebSocket session {} closed by client", self.session_id);
                    break;
                }
                Ok(Message::Ping(data)) => {
                    if let Err(e) = self.socket.send(Message::Pong(data)).await {
                        error!("Failed to send pong to {}: {}", self.session_id, e);
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error for {}: {}", self.session_id, e);
                    break;
                }
            }
        }

        info!("WebSocket session {} ended", self.session_id);
    }

    async fn handle_text_message(&mut self, text: &str) -> Result<(), SessionError> {
        match serde_json::from_str::<ClientCommand>(text) {
            Ok(command) => {
                info!("Session {} applying {:?}", self.session_id, command);
                let changed = self.state.control.lock().await.apply(command);
                self.send_state(changed).await
            }
            Err(e) => {
                warn!("Failed to parse command from {}: {}", self.session_id, e);
                // Don't break the connection for parse errors.
                self.send_response(&SessionResponse::Error {
                    message: e.to_string(),
                })
                .await
            }
        }
    }

    async fn send_state(&mut self, changed: bool) -> Result<(), SessionError> {
        let state = self.state.control.lock().await.snapshot();
        self.send_response(&SessionResponse::State { changed, state })
            .await
    }

    async fn send_response(
        &mut self,
        response: &SessionResponse,
    ) -> Result<(), SessionError> {
        let json = serde_json::to_string(response)?;
        self.socket.send(Message::Text(json)).await?;
        Ok(())
    }
}

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Generate a unique session ID
pub fn generate_session_id() -> String {
    format!("session_{}", NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
}

/// Create and handle a new WebSocket session
pub async fn handle_websocket_connection(socket: WebSocket, state: AppState) {
    let session_id = generate_session_id();
    let session = WebSocketSession::new(socket, state, session_id);
    session.handle().await;
}
