use axum::{Router, routing::post};
use tower_http::trace::TraceLayer;

use crate::handlers::analysis;
use crate::state::AppState;
use std::sync::Arc;

/// Create the REST API router
///
/// The health check route is registered separately in main.rs so it stays
/// reachable even when stricter layers wrap these routes.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analyze-text", post(analysis::analyze_text))
        .route("/analyze-image", post(analysis::analyze_image))
        .layer(TraceLayer::new_for_http())
}
