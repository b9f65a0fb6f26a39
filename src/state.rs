//! Shared application state
//!
//! Holds the validated configuration and the collaborator clients every
//! session borrows: transcription, language model, optional speech
//! synthesis, and vision. Built once at startup and shared behind an `Arc`.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::{
    DeepgramSTT, ElevenLabsTTS, GeminiLLM, GeminiVision, LanguageModel, STTConfig,
    SpeechSynthesizer, SpeechToText, TTSConfig, VisionAnalyzer,
};

/// The collaborator clients a session talks to.
///
/// Cloning is cheap: each handle is an `Arc` to a shared client. TTS is
/// optional; when absent, replies stay text-only.
#[derive(Clone)]
pub struct Collaborators {
    pub stt: Arc<dyn SpeechToText>,
    pub llm: Arc<dyn LanguageModel>,
    pub tts: Option<Arc<dyn SpeechSynthesizer>>,
    pub vision: Arc<dyn VisionAnalyzer>,
}

/// Shared application state for all handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub collaborators: Collaborators,
}

impl AppState {
    /// Build the application state from a validated configuration.
    ///
    /// Constructs the collaborator clients. Fails when a required key is
    /// missing or a client rejects its configuration.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let stt_config = STTConfig {
            api_key: config.get_api_key("deepgram")?,
            model: config.stt_model.clone(),
            language: config.stt_language.clone(),
            ..STTConfig::default()
        };
        let stt: Arc<dyn SpeechToText> = Arc::new(DeepgramSTT::new(stt_config)?);

        let google_key = config.get_api_key("google")?;
        let llm: Arc<dyn LanguageModel> =
            Arc::new(GeminiLLM::new(google_key.clone(), config.gemini_model.clone())?);
        let vision: Arc<dyn VisionAnalyzer> =
            Arc::new(GeminiVision::new(google_key, config.gemini_model.clone())?);

        let tts: Option<Arc<dyn SpeechSynthesizer>> = match &config.elevenlabs_api_key {
            Some(key) => {
                let tts_config = TTSConfig {
                    api_key: key.clone(),
                    voice_id: config.elevenlabs_voice_id.clone(),
                    ..TTSConfig::default()
                };
                info!(voice_id = %tts_config.voice_id, "Speech synthesis enabled");
                Some(Arc::new(ElevenLabsTTS::new(tts_config)?))
            }
            None => {
                warn!("No ElevenLabs API key configured; replies will be text-only");
                None
            }
        };

        Ok(Arc::new(Self {
            config,
            collaborators: Collaborators {
                stt,
                llm,
                tts,
                vision,
            },
        }))
    }

    /// Build state around externally supplied collaborators.
    ///
    /// Lets integration tests wire in mock clients without touching the
    /// network.
    pub fn with_collaborators(config: ServerConfig, collaborators: Collaborators) -> Arc<Self> {
        Arc::new(Self {
            config,
            collaborators,
        })
    }
}
