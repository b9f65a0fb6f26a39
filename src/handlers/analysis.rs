//! Stateless analysis endpoints
//!
//! REST counterparts to the session protocol: one-shot text analysis and
//! image description that go straight to the collaborators without touching
//! any conversation history.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::core::ImageSource;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeTextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeImageRequest {
    /// Optional instruction to steer the description.
    #[serde(default)]
    pub text: Option<String>,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub analysis: String,
}

/// One-shot text analysis with no session context
///
/// The prompt goes to the language model as-is; nothing is recorded in any
/// conversation history.
pub async fn analyze_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeTextRequest>,
) -> AppResult<Json<AnalysisResponse>> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("text must not be empty".into()));
    }

    info!(chars = text.len(), "Text analysis requested");

    let analysis = state
        .collaborators
        .llm
        .reply(text, None)
        .await
        .map_err(|e| {
            error!(error = %e, "Text analysis failed");
            AppError::UpstreamFailure(format!("Language model request failed: {}", e))
        })?;

    Ok(Json(AnalysisResponse { analysis }))
}

/// Describe an image fetched from a remote URL
///
/// Only `http://` and `https://` URLs are accepted here; inline data URLs
/// belong to the WebSocket session protocol.
pub async fn analyze_image(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeImageRequest>,
) -> AppResult<Json<AnalysisResponse>> {
    let url = request.image_url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(AppError::BadRequest(
            "image_url must be an http(s) URL".into(),
        ));
    }

    info!(url = %url, "Image analysis requested");

    let source = ImageSource::Url(url.to_string());
    let analysis = state
        .collaborators
        .vision
        .describe(&source, request.text.as_deref())
        .await
        .map_err(|e| {
            error!(error = %e, "Image analysis failed");
            AppError::UpstreamFailure(format!("Image analysis failed: {}", e))
        })?;

    Ok(Json(AnalysisResponse { analysis }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_image_request_deserializes_without_text() {
        let request: AnalyzeImageRequest =
            serde_json::from_str(r#"{"image_url": "https://example.com/a.png"}"#)
                .expect("valid request");
        assert_eq!(request.image_url, "https://example.com/a.png");
        assert!(request.text.is_none());
    }

    #[test]
    fn test_analysis_response_serializes_analysis_field() {
        let body = serde_json::to_string(&AnalysisResponse {
            analysis: "a study in blue".to_string(),
        })
        .expect("serializable");
        assert_eq!(body, r#"{"analysis":"a study in blue"}"#);
    }
}
