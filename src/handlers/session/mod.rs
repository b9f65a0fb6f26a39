//! Tutoring session WebSocket handlers
//!
//! This module provides the WebSocket surface for one live tutoring
//! session: streaming speech transcription, assistant replies with
//! synthesized speech, and asynchronous image analysis.
//!
//! # Protocol
//!
//! ## Client → Server
//!
//! - **start_recording**: Open a transcription stream
//! - **stop_recording**: Close the active transcription stream
//! - **analyze_image**: Submit an image as a data URL
//! - **Binary frames**: Raw audio chunks (only meaningful while recording)
//! - Any other text frame is treated as a legacy plain-text transcript
//!
//! ## Server → Client
//!
//! - **transcription**: Reconciled transcript text
//! - **ai_response**: Assistant reply text
//! - **ai_audio**: Synthesized speech, base64-encoded
//! - **error**: A recoverable error
//! - **command**: UI control instruction (`enable_analyze_button`)

mod handler;
pub mod machine;
pub mod messages;

pub use handler::session_websocket_handler;
pub use machine::{ConnectionState, Session, SessionEvent};
