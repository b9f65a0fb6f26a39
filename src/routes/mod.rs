//! Route configuration
//!
//! Routers are assembled here and composed in `main.rs`, where shared state
//! and cross-cutting layers (CORS, security headers) are applied.

pub mod api;
pub mod session;

pub use api::create_api_router;
pub use session::create_session_router;
