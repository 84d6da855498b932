//! Language-model collaborators
//!
//! The engine owns prompts and reply parsing; a `ModelClient` only moves a
//! `PromptRequest` over the wire and hands back the raw reply text.

pub mod gemini;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::prompt::PromptRequest;

pub use gemini::{GeminiClient, GeminiConfig};

/// Failures while calling a model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("authentication rejected ({status})")]
    Authentication { status: u16 },

    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model returned no text")]
    EmptyReply,

    #[error("unexpected API response: {0}")]
    InvalidResponse(String),

    #[error("client configuration error: {0}")]
    Config(String),
}

/// Something that can answer a prompt
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send one prompt, return the reply text unparsed
    async fn complete(&self, request: &PromptRequest) -> Result<String, ModelError>;

    /// Model identifier, for logs
    fn model_name(&self) -> &str;
}
