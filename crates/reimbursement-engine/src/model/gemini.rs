//! Google Gemini client
//!
//! Calls the `generateContent` REST endpoint with the fixed instructions as
//! `systemInstruction` and asks for a JSON response body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ModelClient, ModelError};
use crate::prompt::PromptRequest;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Credentials and endpoint for the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Instruction<'a>,
    contents: Vec<Turn<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Instruction<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    #[serde(default)]
    text: String,
}

/// HTTP client for the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// # Errors
    /// `ModelError::Config` when the API key is blank or the HTTP client
    /// cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self, ModelError> {
        if config.api_key.trim().is_empty() {
            return Err(ModelError::Config("Gemini API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn map_send_error(&self, err: reqwest::Error) -> ModelError {
        if err.is_timeout() {
            ModelError::Timeout(self.config.timeout)
        } else {
            ModelError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn complete(&self, request: &PromptRequest) -> Result<String, ModelError> {
        let user_prompt = request.user_prompt();
        let body = GenerateRequest {
            system_instruction: Instruction {
                parts: vec![TextPart {
                    text: request.system,
                }],
            },
            contents: vec![Turn {
                role: "user",
                parts: vec![TextPart { text: &user_prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.0,
            },
        };

        debug!(
            "Calling {} for {} ({} prompt chars)",
            self.config.model,
            request.invoice_name,
            user_prompt.len()
        );

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ModelError::Authentication {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(self.config.timeout)
            } else {
                ModelError::InvalidResponse(e.to_string())
            }
        })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ModelError::EmptyReply);
        }

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
