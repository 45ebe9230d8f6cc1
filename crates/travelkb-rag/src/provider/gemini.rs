use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::http::{client, send_json, text_at};
use super::{GenerationBackend, GenerationRequest, ProviderError};

const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Google `generateContent`.
pub struct GeminiBackend {
    api_key: String,
    model: String,
    timeout: Duration,
    client: Client,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: Option<&str>, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            timeout,
            client: client(timeout)?,
        })
    }

    fn url(&self) -> String { format!("{ENDPOINT}/{}:generateContent", self.model) }

    fn body(request: &GenerationRequest) -> Value {
        json!({
            "systemInstruction": {"parts": [{"text": request.system}]},
            "contents": [{"role": "user", "parts": [{"text": request.prompt}]}],
            "generationConfig": {
                "maxOutputTokens": request.max_tokens,
                "temperature": request.temperature,
            },
        })
    }
}

/// Candidate text, or why there is none.
fn extract(body: &Value) -> Result<String, ProviderError> {
    if let Some(reason) = body.pointer("/promptFeedback/blockReason").and_then(Value::as_str) {
        return Err(ProviderError::Malformed(format!("prompt blocked: {reason}")));
    }
    text_at(body, "/candidates/0/content/parts/0/text")
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str { "gemini" }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let http = self.client.post(self.url()).header("x-goog-api-key", &self.api_key).json(&Self::body(request));
        let body = send_json(http, self.timeout).await?;
        extract(&body)
    }
}
