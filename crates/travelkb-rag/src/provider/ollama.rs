use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::http::{client, send_json, text_at};
use super::{GenerationBackend, GenerationRequest, ProviderError};

pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Local Ollama server, `/api/chat` without streaming.
pub struct OllamaBackend {
    base_url: String,
    model: String,
    timeout: Duration,
    client: Client,
}

impl OllamaBackend {
    /// `host` defaults to `http://localhost:11434`; a bare `host:port` gets
    /// an `http://` scheme.
    pub fn new(host: Option<&str>, model: Option<&str>, timeout: Duration) -> Result<Self, ProviderError> {
        let host = host.map(str::trim).filter(|h| !h.is_empty()).unwrap_or(DEFAULT_HOST);
        let base_url = if host.contains("://") { host.to_string() } else { format!("http://{host}") };
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            timeout,
            client: client(timeout)?,
        })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn body(&self, request: &GenerationRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
            "stream": false,
            "options": {"num_predict": request.max_tokens, "temperature": request.temperature},
        })
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn name(&self) -> &str { "ollama" }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = send_json(self.client.post(url).json(&self.body(request)), self.timeout).await?;
        text_at(&body, "/message/content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_normalization() {
        let t = Duration::from_secs(1);
        assert_eq!(OllamaBackend::new(None, None, t).unwrap().base_url(), DEFAULT_HOST);
        assert_eq!(OllamaBackend::new(Some("gpu-box:11434"), None, t).unwrap().base_url(), "http://gpu-box:11434");
        assert_eq!(OllamaBackend::new(Some("https://o.local/"), None, t).unwrap().base_url(), "https://o.local");
    }

    #[test]
    fn non_streaming_body() {
        let o = OllamaBackend::new(None, None, Duration::from_secs(1)).unwrap();
        let req = GenerationRequest { system: "s".into(), prompt: "p".into(), max_tokens: 32, temperature: 0.0 };
        let body = o.body(&req);
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 32);
        assert_eq!(body["model"], DEFAULT_MODEL);
    }
}
