//! Shared mock collaborators for integration tests.
//!
//! These stand in for the real Deepgram, Gemini, and ElevenLabs clients so
//! end-to-end tests can drive full request flows without touching the
//! network.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use atelier_gateway::core::{
    DataUrl, ImageSource, LLMError, LLMResult, LanguageModel, STTResult, SpeechSynthesizer,
    SpeechToText, TTSResult, TranscriptFragment, TranscriptionStream, VisionAnalyzer, VisionError,
    VisionResult,
};
use atelier_gateway::state::{AppState, Collaborators};
use atelier_gateway::{ServerConfig, routes};

pub const CANNED_REPLY: &str = "Impressionism favors loose brushwork and visible light.";
pub const CANNED_DESCRIPTION: &str = "A seascape in broken color, likely late 19th century.";
pub const CANNED_AUDIO: &[u8] = b"riff-mock-audio";

/// Minimal configuration for integration tests.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        server_name: "Atelier Gateway".to_string(),
        tls: None,
        deepgram_api_key: Some("test-deepgram-key".to_string()),
        google_api_key: Some("test-google-key".to_string()),
        elevenlabs_api_key: None,
        stt_model: "nova-2".to_string(),
        stt_language: "en-US".to_string(),
        gemini_model: "gemini-1.5-flash-latest".to_string(),
        elevenlabs_voice_id: "test-voice".to_string(),
        cors_allowed_origins: None,
    }
}

/// Transcribes the first audio chunk of every stream as one scripted
/// final utterance.
pub struct ScriptedSTT {
    pub utterance: String,
}

impl ScriptedSTT {
    pub fn speaking(utterance: &str) -> Self {
        Self {
            utterance: utterance.to_string(),
        }
    }
}

#[async_trait]
impl SpeechToText for ScriptedSTT {
    async fn open_stream(
        &self,
        fragments: mpsc::Sender<TranscriptFragment>,
    ) -> STTResult<Box<dyn TranscriptionStream>> {
        Ok(Box::new(ScriptedStream {
            utterance: self.utterance.clone(),
            fragments,
            spoken: false,
        }))
    }
}

struct ScriptedStream {
    utterance: String,
    fragments: mpsc::Sender<TranscriptFragment>,
    spoken: bool,
}

#[async_trait]
impl TranscriptionStream for ScriptedStream {
    async fn send_audio(&mut self, _chunk: Bytes) -> STTResult<()> {
        if !self.spoken {
            self.spoken = true;
            let _ = self
                .fragments
                .send(TranscriptFragment {
                    text: self.utterance.clone(),
                    is_final: true,
                })
                .await;
        }
        Ok(())
    }

    async fn finish(&mut self) -> STTResult<()> {
        Ok(())
    }
}

/// Replies with a fixed string to every prompt.
pub struct CannedLLM;

#[async_trait]
impl LanguageModel for CannedLLM {
    async fn reply(&self, _prompt: &str, _image: Option<&DataUrl>) -> LLMResult<String> {
        Ok(CANNED_REPLY.to_string())
    }
}

/// Fails every prompt.
pub struct FailingLLM;

#[async_trait]
impl LanguageModel for FailingLLM {
    async fn reply(&self, _prompt: &str, _image: Option<&DataUrl>) -> LLMResult<String> {
        Err(LLMError::RequestFailed("mock outage".to_string()))
    }
}

/// Synthesizes every text to the same byte string.
pub struct CannedTTS;

#[async_trait]
impl SpeechSynthesizer for CannedTTS {
    async fn synthesize(&self, _text: &str) -> TTSResult<Bytes> {
        Ok(Bytes::from_static(CANNED_AUDIO))
    }
}

/// Describes every image with a fixed string.
pub struct CannedVision;

#[async_trait]
impl VisionAnalyzer for CannedVision {
    async fn describe(&self, _image: &ImageSource, _prompt: Option<&str>) -> VisionResult<String> {
        Ok(CANNED_DESCRIPTION.to_string())
    }
}

/// Fails every image.
pub struct FailingVision;

#[async_trait]
impl VisionAnalyzer for FailingVision {
    async fn describe(&self, _image: &ImageSource, _prompt: Option<&str>) -> VisionResult<String> {
        Err(VisionError::RequestFailed("mock outage".to_string()))
    }
}

/// Default all-canned collaborator set, TTS included.
pub fn canned_collaborators() -> Collaborators {
    Collaborators {
        stt: Arc::new(ScriptedSTT::speaking("What is impressionism?")),
        llm: Arc::new(CannedLLM),
        tts: Some(Arc::new(CannedTTS)),
        vision: Arc::new(CannedVision),
    }
}

/// Assemble the full application router the way main.rs does.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/",
            axum::routing::get(atelier_gateway::handlers::api::health_check),
        )
        .merge(routes::create_api_router())
        .merge(routes::create_session_router())
        .with_state(state)
}

/// Serve the app on an ephemeral port and return its address.
pub async fn spawn_app(state: Arc<AppState>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let router = app(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    addr
}
