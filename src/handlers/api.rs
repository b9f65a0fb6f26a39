use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

/// Health check endpoint
///
/// Returns a liveness message so deployment probes and browser checks can
/// confirm the gateway is up before opening a WebSocket session.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": format!("{} is running", state.config.server_name)
    }))
}
