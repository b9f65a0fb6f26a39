//! Language-model collaborator boundary.

pub mod gemini;

pub use gemini::GeminiLLM;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::vision::DataUrl;

/// Errors from the language-model collaborator.
#[derive(Debug, Error)]
pub enum LLMError {
    /// The request could not be delivered.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The collaborator answered with a non-success status.
    #[error("service returned {status}: {body}")]
    BadStatus { status: u16, body: String },

    /// The collaborator refused to answer the prompt.
    #[error("completion blocked: {0}")]
    Blocked(String),

    /// The collaborator answered without any text.
    #[error("empty completion")]
    EmptyCompletion,

    /// The client was constructed with unusable settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience result for language-model operations.
pub type LLMResult<T> = Result<T, LLMError>;

/// Language-model collaborator.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Produce assistant text for a rendered prompt, optionally grounded on
    /// an image the conversation is about.
    async fn reply(&self, prompt: &str, image: Option<&DataUrl>) -> LLMResult<String>;
}
