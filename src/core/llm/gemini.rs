//! Gemini generateContent client.
//!
//! One HTTP call per reply. The request carries the rendered prompt as a
//! text part and, when the conversation has an active image, an inline data
//! part beside it. The wire types are shared with the vision client, which
//! speaks the same API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LLMError, LLMResult, LanguageModel};
use crate::core::vision::DataUrl;

/// Gemini API base.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for replies and analysis.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How much of an upstream error body is carried into errors.
const ERROR_BODY_LIMIT: usize = 512;

/// Gemini language-model collaborator client.
#[derive(Debug, Clone)]
pub struct GeminiLLM {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiLLM {
    /// Create a client against the production endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> LLMResult<Self> {
        Self::with_base_url(api_key, model, GEMINI_API_BASE)
    }

    /// Create a client against a custom endpoint.
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> LLMResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LLMError::InvalidConfig("api key is required".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LLMError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            model: model.into(),
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LanguageModel for GeminiLLM {
    async fn reply(&self, prompt: &str, image: Option<&DataUrl>) -> LLMResult<String> {
        let mut parts = vec![Part::Text {
            text: prompt.to_string(),
        }];
        if let Some(image) = image {
            parts.push(Part::inline_image(image));
        }
        let request = GenerateContentRequest {
            contents: vec![Content { parts }],
        };

        debug!(model = %self.model, with_image = image.is_some(), "requesting completion");
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| LLMError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::BadStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LLMError::RequestFailed(e.to_string()))?;
        extract_reply(payload)
    }
}

fn extract_reply(payload: GenerateContentResponse) -> LLMResult<String> {
    if let Some(feedback) = payload.prompt_feedback
        && let Some(reason) = feedback.block_reason
    {
        return Err(LLMError::Blocked(reason));
    }
    let text = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    if text.is_empty() {
        return Err(LLMError::EmptyCompletion);
    }
    Ok(text)
}

pub(crate) fn truncate_body(body: &str) -> String {
    let mut end = body.len().min(ERROR_BODY_LIMIT);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

// =============================================================================
// Wire types, shared with the vision client
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub(crate) fn inline_image(image: &DataUrl) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.base64_data.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}
