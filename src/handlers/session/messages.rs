//! Wire protocol for the tutoring session WebSocket.
//!
//! Two frame kinds travel on the socket: binary frames carry raw audio
//! chunks upstream, text frames carry JSON objects tagged by `type` in both
//! directions. Text frames that do not parse as a known control message are
//! legacy plain-text transcript fragments, not protocol errors.

use serde::{Deserialize, Serialize};

/// Maximum accepted WebSocket frame size.
pub const MAX_FRAME_SIZE: usize = 2 * 1024 * 1024;

/// Maximum accepted WebSocket message size after reassembly. Sized for
/// data-URL image payloads.
pub const MAX_MESSAGE_SIZE: usize = 12 * 1024 * 1024;

/// Maximum accepted `analyze_image` payload length in bytes.
pub const MAX_IMAGE_PAYLOAD_SIZE: usize = 10 * 1024 * 1024;

// =============================================================================
// Client to server
// =============================================================================

/// Typed control messages a client sends as text frames.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Begin streaming audio for transcription.
    #[serde(rename = "start_recording")]
    StartRecording,

    /// Stop the active recording.
    #[serde(rename = "stop_recording")]
    StopRecording,

    /// Submit an image for analysis. The payload is a data URL.
    #[serde(rename = "analyze_image")]
    AnalyzeImage {
        #[serde(rename = "dataUrl")]
        data_url: String,
    },
}

impl ClientMessage {
    /// Validate payload limits before the message enters the session.
    pub fn validate(&self) -> Result<(), FrameValidationError> {
        match self {
            ClientMessage::AnalyzeImage { data_url } if data_url.len() > MAX_IMAGE_PAYLOAD_SIZE => {
                Err(FrameValidationError {
                    field: "dataUrl",
                    actual: data_url.len(),
                    limit: MAX_IMAGE_PAYLOAD_SIZE,
                })
            }
            _ => Ok(()),
        }
    }
}

/// A decoded client text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    /// A typed control message.
    Control(ClientMessage),
    /// Anything else: a legacy client sent the transcript fragment as plain
    /// text (or unknown JSON), carried through as fragment text.
    LegacyTranscript(String),
}

/// Decode a text frame, falling back to the legacy plain-text form.
pub fn decode_text_frame(raw: &str) -> ClientFrame {
    match serde_json::from_str::<ClientMessage>(raw) {
        Ok(message) => ClientFrame::Control(message),
        Err(_) => ClientFrame::LegacyTranscript(raw.to_string()),
    }
}

// =============================================================================
// Server to client
// =============================================================================

/// Actions the server can instruct the client UI to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    /// Re-enable the image submission control after an analysis resolves.
    EnableAnalyzeButton,
}

/// Typed events the server sends as text frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Reconciled transcript text for display.
    #[serde(rename = "transcription")]
    Transcription { text: String },

    /// Assistant reply text.
    #[serde(rename = "ai_response")]
    AiResponse { text: String },

    /// Synthesized assistant speech, base64-encoded.
    #[serde(rename = "ai_audio")]
    AiAudio { audio_base64: String },

    /// A recoverable error surfaced to the client.
    #[serde(rename = "error")]
    Error { text: String },

    /// A UI control instruction.
    #[serde(rename = "command")]
    Command { action: CommandAction },
}

/// Routing envelope between the session loop and the socket sender task.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageRoute {
    /// Serialize and send as a text frame.
    Outgoing(ServerMessage),
    /// Close the client connection.
    Close,
}

// =============================================================================
// Validation
// =============================================================================

/// A client payload exceeded a protocol limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameValidationError {
    /// Offending field.
    pub field: &'static str,
    /// Received length in bytes.
    pub actual: usize,
    /// Maximum allowed length in bytes.
    pub limit: usize,
}

impl std::fmt::Display for FrameValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} is {} bytes, exceeding the {} byte limit",
            self.field, self.actual, self.limit
        )
    }
}

impl std::error::Error for FrameValidationError {}
