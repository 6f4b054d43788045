//! Client for the third-party generation API (OpenAI-compatible).

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("generation API key is not configured")]
    NotConfigured,

    #[error("generation API error {status}: {message}")]
    Api { status: u16, code: Option<String>, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("generation API returned no content")]
    EmptyResponse,
}

impl GenerationError {
    /// Upstream error code, reported to clients as `error.type`.
    pub fn kind(&self) -> &str {
        match self {
            GenerationError::NotConfigured => "not_configured",
            GenerationError::Api { code: Some(code), .. } => code.as_str(),
            GenerationError::Api { status: 429, .. } => "rate_limit_exceeded",
            GenerationError::Api { .. } => "api_error",
            GenerationError::Network(_) => "network_error",
            GenerationError::EmptyResponse => "empty_response",
        }
    }

    /// Kid-friendly (message, details) pair.
    pub fn friendly(&self) -> (&'static str, &'static str) {
        match self.kind() {
            "insufficient_quota" | "not_configured" => ("The AI art service is temporarily unavailable", "Please try again later"),
            "invalid_request_error" => ("There was a problem with your request", "Try describing your idea differently"),
            "rate_limit_exceeded" => ("Too many people are creating art right now", "Please wait a moment and try again"),
            _ if self.is_content_policy() => (
                "Let's try a different creative idea! 🎨",
                "The AI couldn't create that image. Try something fun and colorful instead!",
            ),
            _ => ("Something went wrong creating your AI art", ""),
        }
    }

    fn is_content_policy(&self) -> bool {
        match self {
            GenerationError::Api { code, message, .. } => {
                code.as_deref() == Some("content_policy_violation") || message.contains("content_policy_violation")
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageModel {
    #[serde(rename = "dall-e-2")]
    DallE2,
    #[serde(rename = "dall-e-3")]
    DallE3,
}

impl ImageModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageModel::DallE2 => "dall-e-2",
            ImageModel::DallE3 => "dall-e-3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub model: ImageModel,
    /// e.g. "256x256"
    pub size: &'static str,
    pub prompt: String,
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the URL of the generated image.
    async fn image(&self, request: &ImageRequest) -> Result<String, GenerationError>;

    /// Single-turn chat completion.
    async fn text(&self, system: &str, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
}

pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String { format!("{}/{}", self.config.base_url.trim_end_matches('/'), path) }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, GenerationError> {
        let key = self.config.api_key.as_deref().ok_or(GenerationError::NotConfigured)?;
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(key)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorBody>(&text).ok().map(|b| b.error);
            return Err(GenerationError::Api {
                status: status.as_u16(),
                code: detail.as_ref().and_then(|d| d.code.clone().or_else(|| d.kind.clone())),
                message: detail.map(|d| d.message).unwrap_or(text),
            });
        }
        response.json().await.map_err(|e| GenerationError::Api {
            status: status.as_u16(),
            code: None,
            message: format!("failed to parse response: {e}"),
        })
    }
}

#[async_trait]
impl Generator for OpenAiClient {
    async fn image(&self, request: &ImageRequest) -> Result<String, GenerationError> {
        let dalle3 = request.model == ImageModel::DallE3;
        let body = ImageGenerationBody {
            model: request.model,
            prompt: &request.prompt,
            n: 1,
            size: request.size,
            quality: dalle3.then_some("standard"),
            style: dalle3.then_some("natural"),
        };
        tracing::debug!(model = request.model.as_str(), size = request.size, "requesting image");
        let response: ImageGenerationResponse = self.post("images/generations", &body).await?;
        response.data.into_iter().next().and_then(|d| d.url).ok_or(GenerationError::EmptyResponse)
    }

    async fn text(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        let body = ChatBody {
            model: &self.config.text_model,
            messages: vec![ChatMessage { role: "system", content: system }, ChatMessage { role: "user", content: prompt }],
        };
        tracing::debug!(model = %self.config.text_model, prompt_len = prompt.len(), "requesting chat completion");
        let response: ChatResponse = self.post("chat/completions", &body).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[derive(Serialize)]
struct ImageGenerationBody<'a> {
    model: ImageModel,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
}

#[derive(Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(code: Option<&str>, message: &str) -> GenerationError {
        GenerationError::Api { status: 400, code: code.map(str::to_string), message: message.into() }
    }

    #[test]
    fn upstream_codes_map_to_friendly_messages() {
        assert_eq!(api(Some("insufficient_quota"), "").friendly().0, "The AI art service is temporarily unavailable");
        assert_eq!(api(Some("rate_limit_exceeded"), "").friendly().0, "Too many people are creating art right now");
        assert_eq!(api(None, "Your request was rejected: content_policy_violation").friendly().0, "Let's try a different creative idea! 🎨");
        assert_eq!(GenerationError::Network("boom".into()).friendly().0, "Something went wrong creating your AI art");
        assert_eq!(GenerationError::Api { status: 429, code: None, message: String::new() }.kind(), "rate_limit_exceeded");
    }

    #[test]
    fn dalle3_body_carries_quality_and_style() {
        let body = ImageGenerationBody { model: ImageModel::DallE3, prompt: "a cat", n: 1, size: "1024x1024", quality: Some("standard"), style: Some("natural") };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "dall-e-3");
        assert_eq!(json["style"], "natural");
        let body = ImageGenerationBody { model: ImageModel::DallE2, prompt: "a cat", n: 1, size: "256x256", quality: None, style: None };
        assert!(serde_json::to_value(&body).unwrap().get("quality").is_none());
    }
}
