//! ElevenLabs TTS client.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://api.elevenlabs.io/v1/text-to-speech/{voice_id}`
//! - Auth: `xi-api-key` header
//! - Output: mp3

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use tracing::debug;

use super::{SpeechSynthesizer, TTSConfig, TTSError, TTSResult};

/// ElevenLabs API base.
pub const ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io/v1";

/// Default voice.
pub const DEFAULT_VOICE_ID: &str = "1SM7GgM6IMuvQlz2BwM3";

/// Default synthesis model.
pub const DEFAULT_TTS_MODEL: &str = "eleven_multilingual_v2";

/// Per-request timeout. Clips for long replies take a while to render.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// ElevenLabs speech synthesizer.
#[derive(Debug, Clone)]
pub struct ElevenLabsTTS {
    client: reqwest::Client,
    config: TTSConfig,
    base_url: String,
}

impl ElevenLabsTTS {
    /// Create a synthesizer against the production endpoint, or the
    /// configured override.
    pub fn new(config: TTSConfig) -> TTSResult<Self> {
        if config.api_key.is_empty() {
            return Err(TTSError::InvalidConfig("api key is required".to_string()));
        }
        if config.voice_id.is_empty() {
            return Err(TTSError::InvalidConfig("voice id is required".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TTSError::InvalidConfig(e.to_string()))?;
        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| ELEVENLABS_API_BASE.to_string());
        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/text-to-speech/{}", self.base_url, self.config.voice_id)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsTTS {
    async fn synthesize(&self, text: &str) -> TTSResult<Bytes> {
        let body = json!({
            "text": text,
            "model_id": self.config.model,
        });

        debug!(voice_id = %self.config.voice_id, chars = text.len(), "synthesizing speech");
        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", &self.config.api_key)
            .header("Accept", "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| TTSError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TTSError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| TTSError::RequestFailed(e.to_string()))?;
        if audio.is_empty() {
            return Err(TTSError::EmptyAudio);
        }
        debug!(bytes = audio.len(), "synthesized audio clip");
        Ok(audio)
    }
}
