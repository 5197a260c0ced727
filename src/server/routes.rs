//! Route handlers for the segment state server.

use axum::{
    Router,
    extract::{State, ws::WebSocketUpgrade},
    response::{Json, Response},
    routing::get,
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::segments::ObjectId;
use crate::server::state::{AppState, StateSnapshot};
use crate::server::websocket::handle_websocket_connection;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Basic health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running!".to_string(),
    })
}

/// Control-side segment state
pub async fn control_state(State(state): State<AppState>) -> Json<StateSnapshot> {
    let control = state.control.lock().await;
    Json(control.snapshot())
}

/// Compute-side view of every replicated set
pub async fn counterparts(State(state): State<AppState>) -> Json<BTreeMap<ObjectId, Vec<String>>> {
    Json(state.compute_snapshot())
}

/// WebSocket endpoint for interactive edits
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, state))
}

/// Creates and configures the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/state", get(control_state))
        .route("/counterparts", get(counterparts))
        .route("/ws", get(ws_handler))
        .with_state(state)
}
