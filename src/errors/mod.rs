//! Error types shared across the gateway.

pub mod app_error;
pub mod session_error;

pub use app_error::{AppError, AppResult};
pub use session_error::SessionError;
