//! Text-to-speech synthesis.
//!
//! Replies are voiced as a single clip per turn, so the boundary is a
//! one-shot call that returns the full encoded audio. Synthesis is optional
//! at runtime; sessions without a configured synthesizer stay text-only.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub mod elevenlabs;

pub use elevenlabs::ElevenLabsTTS;

/// TTS errors.
#[derive(Debug, Error)]
pub enum TTSError {
    /// The HTTP request could not be sent or the response not read.
    #[error("synthesis request failed: {0}")]
    RequestFailed(String),

    /// The synthesis service rejected the request.
    #[error("synthesis service returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    /// The service answered with no audio.
    #[error("synthesis produced no audio")]
    EmptyAudio,

    /// Invalid configuration.
    #[error("invalid synthesis configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for TTS operations.
pub type TTSResult<T> = Result<T, TTSError>;

/// Configuration for a synthesizer.
#[derive(Debug, Clone)]
pub struct TTSConfig {
    /// API key.
    pub api_key: String,
    /// Voice to synthesize with.
    pub voice_id: String,
    /// Synthesis model.
    pub model: String,
    /// Endpoint override, used by tests.
    pub endpoint: Option<String>,
}

impl Default for TTSConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            voice_id: elevenlabs::DEFAULT_VOICE_ID.to_string(),
            model: elevenlabs::DEFAULT_TTS_MODEL.to_string(),
            endpoint: None,
        }
    }
}

/// One-shot speech synthesis.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and return the encoded audio clip.
    async fn synthesize(&self, text: &str) -> TTSResult<Bytes>;
}
