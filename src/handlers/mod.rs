//! HTTP and WebSocket request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Health check endpoint
//! - `analysis` - Stateless text and image analysis REST endpoints
//! - `session` - WebSocket tutoring session (audio in, transcripts and replies out)

pub mod analysis;
pub mod api;
pub mod session;

// Re-export commonly used handlers for convenient access
pub use session::session_websocket_handler;
