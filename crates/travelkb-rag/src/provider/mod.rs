//! Generation backends. Every backend answers one request with plain text;
//! failures are classified into `ProviderError` so the synthesizer can treat
//! them uniformly and move on to the next backend.

mod chat_completions;
mod gemini;
mod http;
mod ollama;
mod registry;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use chat_completions::ChatCompletionsBackend;
pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;
pub use registry::{ProviderDescriptor, ProviderRegistry};

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("no credential configured for {0}")]
    MissingCredential(String),
    #[error("authentication rejected (HTTP {0})")]
    Auth(u16),
    #[error("rate limited")]
    RateLimited,
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("empty response")]
    Empty,
}

impl ProviderError {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential(_) => "missing_credential",
            Self::Auth(_) => "auth",
            Self::RateLimited => "rate_limited",
            Self::Timeout(_) => "timeout",
            Self::Http(_) => "http",
            Self::Malformed(_) => "malformed",
            Self::Empty => "empty",
        }
    }
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}
