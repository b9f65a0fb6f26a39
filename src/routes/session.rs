//! Session WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::session::session_websocket_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the session WebSocket router
///
/// # Endpoint
///
/// `GET /ws` - WebSocket upgrade for a tutoring session
///
/// # Protocol
///
/// After the upgrade, clients send:
/// - Binary frames with raw microphone audio
/// - `{"type": "start_recording"}` / `{"type": "stop_recording"}`
/// - `{"type": "analyze_image", "dataUrl": "data:image/..;base64,.."}`
///
/// Server responds with:
/// - `{"type": "transcription", "text": ...}` for accepted transcripts
/// - `{"type": "ai_response", "text": ...}` for tutor replies
/// - `{"type": "ai_audio", "audio_base64": ...}` for synthesized speech
/// - `{"type": "command", "action": ...}` for UI nudges
/// - `{"type": "error", "text": ...}` on failures
pub fn create_session_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(session_websocket_handler))
        .layer(TraceLayer::new_for_http())
}
