//! Text generation backend for the assistant endpoints
//!
//! Handlers talk to a [`TextGenerator`]; production wires in
//! [`GeminiClient`], which calls the Gemini `generateContent` REST API.

use std::{env, time::Duration};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_MODEL: &str = "gemini-flash-latest";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// One piece of a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    /// Binary document sent alongside the text
    InlineData { mime_type: String, data: Vec<u8> },
}

/// Errors raised by a generator
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("prompt blocked: {0}")]
    Blocked(String),

    #[error("empty response")]
    EmptyResponse,
}

/// Produces text from a prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, parts: Vec<PromptPart>) -> Result<String, GeneratorError>;
}

/// Gemini client configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Load the configuration, or `None` when `GEMINI_API_KEY` is not set
    ///
    /// # Environment Variables
    /// - `GEMINI_API_KEY`: API key (assistant disabled when unset)
    /// - `GEMINI_MODEL`: model name (default: `gemini-flash-latest`)
    /// - `GEMINI_BASE_URL`: API root (default: public v1beta endpoint)
    /// - `GEMINI_TIMEOUT`: request timeout in seconds (default: 60)
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())?;

        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout = env::var("GEMINI_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Some(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout),
        })
    }
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GeneratorError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        info!("Gemini generator configured with model {}", config.model);
        Ok(Self { config, client })
    }

    fn build_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }
}

/// JSON body for a single-turn `generateContent` call
fn build_request_body(parts: &[PromptPart]) -> Value {
    let parts: Vec<Value> = parts
        .iter()
        .map(|part| match part {
            PromptPart::Text(text) => json!({ "text": text }),
            PromptPart::InlineData { mime_type, data } => json!({
                "inline_data": {
                    "mime_type": mime_type,
                    "data": STANDARD.encode(data),
                }
            }),
        })
        .collect();

    json!({
        "contents": [{ "role": "user", "parts": parts }]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Concatenated text of the first candidate
fn extract_text(response: GenerateContentResponse) -> Result<String, GeneratorError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    match response.prompt_feedback.and_then(|f| f.block_reason) {
        Some(reason) => Err(GeneratorError::Blocked(reason)),
        None => Err(GeneratorError::EmptyResponse),
    }
}

/// Message of a Gemini error payload, falling back to the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, parts: Vec<PromptPart>) -> Result<String, GeneratorError> {
        debug!("Calling Gemini with {} prompt parts", parts.len());

        let response = self
            .client
            .post(self.build_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&build_request_body(&parts))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        extract_text(response.json::<GenerateContentResponse>().await?)
    }
}
