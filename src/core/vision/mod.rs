//! Vision collaborator boundary.
//!
//! Images reach the gateway two ways: as data URLs on the session protocol
//! and as remote URLs on the REST surface. Both resolve to a mime type and
//! base64 payload before the collaborator sees them.

pub mod gemini;

pub use gemini::GeminiVision;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use thiserror::Error;

/// Default analysis prompt for submitted artwork.
pub const DEFAULT_ANALYSIS_PROMPT: &str = "Analyze this artwork. Describe the style, \
     techniques used, possible period, and artistic elements you observe.";

/// Errors from the vision collaborator.
#[derive(Debug, Error)]
pub enum VisionError {
    /// The image payload could not be understood.
    #[error("invalid image payload: {0}")]
    InvalidPayload(String),

    /// A remote image could not be downloaded.
    #[error("image fetch failed: {0}")]
    FetchFailed(String),

    /// The analysis request could not be delivered.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The collaborator answered with a non-success status.
    #[error("service returned {status}: {body}")]
    BadStatus { status: u16, body: String },

    /// The collaborator refused to analyze the image.
    #[error("analysis blocked: {0}")]
    Blocked(String),

    /// The collaborator answered without any description.
    #[error("empty description")]
    EmptyDescription,

    /// The client was constructed with unusable settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience result for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Where an image to analyze comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Inline `data:` URL from the session protocol.
    DataUrl(String),
    /// Remote http(s) URL from the REST surface.
    Url(String),
}

/// Vision collaborator.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Describe an image. `prompt` overrides the default analysis prompt.
    async fn describe(&self, image: &ImageSource, prompt: Option<&str>) -> VisionResult<String>;
}

// =============================================================================
// Data URLs
// =============================================================================

/// A parsed `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Declared mime type, e.g. `image/png`.
    pub mime_type: String,
    /// Base64 payload, kept encoded.
    pub base64_data: String,
}

impl DataUrl {
    /// Parse and validate a data URL. The payload must decode as base64;
    /// non-base64 data URLs are rejected.
    pub fn parse(raw: &str) -> VisionResult<Self> {
        let rest = raw
            .strip_prefix("data:")
            .ok_or_else(|| VisionError::InvalidPayload("missing data: scheme".to_string()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| VisionError::InvalidPayload("missing payload separator".to_string()))?;
        let mime_type = meta.strip_suffix(";base64").ok_or_else(|| {
            VisionError::InvalidPayload("only base64 data URLs are supported".to_string())
        })?;
        if mime_type.is_empty() {
            return Err(VisionError::InvalidPayload("missing mime type".to_string()));
        }
        if payload.is_empty() {
            return Err(VisionError::InvalidPayload("empty payload".to_string()));
        }
        BASE64_STANDARD
            .decode(payload)
            .map_err(|e| VisionError::InvalidPayload(format!("payload is not valid base64: {e}")))?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            base64_data: payload.to_string(),
        })
    }
}
