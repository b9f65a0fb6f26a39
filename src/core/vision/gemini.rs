//! Gemini vision client.
//!
//! Shares the generateContent wire types with the language-model client and
//! adds image resolution: data URLs are validated in place, remote URLs are
//! downloaded and re-encoded before the request is built.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use tracing::debug;

use super::{
    DEFAULT_ANALYSIS_PROMPT, DataUrl, ImageSource, VisionAnalyzer, VisionError, VisionResult,
};
use crate::core::llm::gemini::{
    Content, GEMINI_API_BASE, GenerateContentRequest, GenerateContentResponse, Part, truncate_body,
};

/// Per-request timeout, covering both image fetch and analysis.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Mime type assumed when a remote image omits Content-Type.
const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

/// Gemini vision collaborator client.
#[derive(Debug, Clone)]
pub struct GeminiVision {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiVision {
    /// Create a client against the production endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> VisionResult<Self> {
        Self::with_base_url(api_key, model, GEMINI_API_BASE)
    }

    /// Create a client against a custom endpoint.
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> VisionResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(VisionError::InvalidConfig("api key is required".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VisionError::InvalidConfig(e.to_string()))?;
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

    /// Download a remote image and encode it for inline submission.
    async fn fetch_image(&self, url: &str) -> VisionResult<DataUrl> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| VisionError::FetchFailed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(VisionError::FetchFailed(format!(
                "image host returned status {status}"
            )));
        }
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .unwrap_or_else(|| FALLBACK_IMAGE_MIME.to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| VisionError::FetchFailed(e.to_string()))?;
        if bytes.is_empty() {
            return Err(VisionError::FetchFailed("image host returned no data".to_string()));
        }
        debug!(bytes = bytes.len(), mime = %mime_type, "fetched remote image");
        Ok(DataUrl {
            mime_type,
            base64_data: BASE64_STANDARD.encode(&bytes),
        })
    }
}

#[async_trait]
impl VisionAnalyzer for GeminiVision {
    async fn describe(&self, image: &ImageSource, prompt: Option<&str>) -> VisionResult<String> {
        let image = match image {
            ImageSource::DataUrl(raw) => DataUrl::parse(raw)?,
            ImageSource::Url(url) => self.fetch_image(url).await?,
        };
        let prompt = prompt.unwrap_or(DEFAULT_ANALYSIS_PROMPT);

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::inline_image(&image),
                ],
            }],
        };

        debug!(model = %self.model, mime = %image.mime_type, "requesting image analysis");
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| VisionError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::BadStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| VisionError::RequestFailed(e.to_string()))?;
        extract_description(payload)
    }
}

fn extract_description(payload: GenerateContentResponse) -> VisionResult<String> {
    if let Some(feedback) = payload.prompt_feedback
        && let Some(reason) = feedback.block_reason
    {
        return Err(VisionError::Blocked(reason));
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
        return Err(VisionError::EmptyDescription);
    }
    Ok(text)
}
