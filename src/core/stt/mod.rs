//! Speech-to-text collaborator boundary.
//!
//! The session opens one live transcription stream per recording: audio
//! chunks flow in through [`TranscriptionStream::send_audio`], transcript
//! fragments flow back on the channel handed to
//! [`SpeechToText::open_stream`] until the collaborator closes the stream
//! or [`TranscriptionStream::finish`] is called.

pub mod deepgram;

pub use deepgram::DeepgramSTT;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from the transcription collaborator.
#[derive(Debug, Error)]
pub enum STTError {
    /// The streaming connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The collaborator rejected the credentials.
    #[error("authentication rejected: {0}")]
    AuthenticationFailed(String),

    /// The stream ended and can no longer accept audio.
    #[error("transcription stream closed")]
    StreamClosed,

    /// The client was constructed with unusable settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience result for transcription operations.
pub type STTResult<T> = Result<T, STTError>;

/// A partial or final piece of transcribed speech. A value, not an entity:
/// fragments are consumed by reconciliation and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFragment {
    /// Transcribed text.
    pub text: String,
    /// Whether the collaborator considers the utterance finished.
    pub is_final: bool,
}

/// Configuration for the transcription collaborator.
#[derive(Debug, Clone)]
pub struct STTConfig {
    /// Collaborator API key.
    pub api_key: String,
    /// Transcription model.
    pub model: String,
    /// Spoken language hint.
    pub language: String,
    /// Emit interim fragments while the speaker is mid-utterance.
    pub interim_results: bool,
    /// Apply punctuation and formatting to final fragments.
    pub smart_format: bool,
    /// Emit voice-activity events on the stream.
    pub vad_events: bool,
    /// Silence window that ends an utterance, in milliseconds.
    pub utterance_end_ms: u32,
    /// Endpoint override, primarily for tests.
    pub endpoint: Option<String>,
}

impl Default for STTConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "nova-2".to_string(),
            language: "en-US".to_string(),
            interim_results: true,
            smart_format: true,
            vad_events: true,
            utterance_end_ms: 1000,
            endpoint: None,
        }
    }
}

/// One live transcription stream.
#[async_trait]
pub trait TranscriptionStream: Send {
    /// Forward one audio chunk in arrival order. Blocks while the stream's
    /// bounded channel is full; callers own the wait cap.
    async fn send_audio(&mut self, chunk: Bytes) -> STTResult<()>;

    /// Signal end of audio and release the stream. Idempotent.
    async fn finish(&mut self) -> STTResult<()>;
}

/// Speech-to-text collaborator.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Open a live stream. Fragments arrive on `fragments` until the
    /// stream ends; dropping the receiver tears the stream down.
    async fn open_stream(
        &self,
        fragments: mpsc::Sender<TranscriptFragment>,
    ) -> STTResult<Box<dyn TranscriptionStream>>;
}
