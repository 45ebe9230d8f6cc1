use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use travelkb_core::config::ProviderKind;

use super::http::{client, send_json, text_at};
use super::{GenerationBackend, GenerationRequest, ProviderError};

/// Any OpenAI-compatible `/chat/completions` endpoint (groq, openai,
/// together, huggingface router).
pub struct ChatCompletionsBackend {
    name: String,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
    client: Client,
}

/// Endpoint and default model for the hosted chat-completions providers.
pub fn defaults(kind: ProviderKind) -> Option<(&'static str, &'static str)> {
    match kind {
        ProviderKind::Groq => Some(("https://api.groq.com/openai/v1/chat/completions", "llama-3.1-8b-instant")),
        ProviderKind::OpenAi => Some(("https://api.openai.com/v1/chat/completions", "gpt-4o-mini")),
        ProviderKind::Together => {
            Some(("https://api.together.xyz/v1/chat/completions", "meta-llama/Llama-3.3-70B-Instruct-Turbo"))
        }
        ProviderKind::HuggingFace => {
            Some(("https://router.huggingface.co/v1/chat/completions", "meta-llama/Llama-3.1-8B-Instruct"))
        }
        ProviderKind::Gemini | ProviderKind::Ollama => None,
    }
}

impl ChatCompletionsBackend {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
            client: client(timeout)?,
        })
    }

    /// Backend for a hosted provider with its stock endpoint; `model`
    /// overrides the default model.
    pub fn for_kind(kind: ProviderKind, api_key: &str, model: Option<&str>, timeout: Duration) -> Result<Self, ProviderError> {
        let (endpoint, default_model) = defaults(kind)
            .ok_or_else(|| ProviderError::Http(format!("{kind} does not speak chat-completions")))?;
        Self::new(kind.as_str(), endpoint, api_key, model.unwrap_or(default_model), timeout)
    }

    pub fn model(&self) -> &str { &self.model }

    fn body(&self, request: &GenerationRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        })
    }
}

#[async_trait]
impl GenerationBackend for ChatCompletionsBackend {
    fn name(&self) -> &str { &self.name }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let http = self.client.post(&self.endpoint).bearer_auth(&self.api_key).json(&self.body(request));
        let body = send_json(http, self.timeout).await?;
        text_at(&body, "/choices/0/message/content")
    }
}
