use std::time::Duration;

use tracing::{debug, info, warn};
use travelkb_core::config::{ProviderKind, ProviderPreference, Settings};

use super::{ChatCompletionsBackend, GeminiBackend, GenerationBackend, OllamaBackend, ProviderError};

/// One candidate provider as seen at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub name: String,
    pub enabled: bool,
    /// Why a provider was left out, when it was.
    pub reason: Option<String>,
}

/// Generation backends in attempt order, built once at startup.
pub struct ProviderRegistry {
    backends: Vec<Box<dyn GenerationBackend>>,
    descriptors: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    pub fn new(backends: Vec<Box<dyn GenerationBackend>>) -> Self {
        let descriptors = backends
            .iter()
            .map(|b| ProviderDescriptor { name: b.name().to_string(), enabled: true, reason: None })
            .collect();
        Self { backends, descriptors }
    }

    /// No backends; every answer is extractive.
    pub fn empty() -> Self { Self::new(Vec::new()) }

    /// Walk the configured order and keep every provider that has what it
    /// needs to run. Ollama needs no key, so it only joins when it is the
    /// named primary or `OLLAMA_HOST` is set.
    pub fn from_settings(settings: &Settings) -> Self {
        let timeout = Duration::from_secs(settings.provider_timeout_secs);
        let primary = match settings.generation_provider {
            ProviderPreference::Primary(k) => Some(k),
            _ => None,
        };
        let mut backends: Vec<Box<dyn GenerationBackend>> = Vec::new();
        let mut descriptors = Vec::new();

        for kind in settings.generation_provider.order() {
            let credential = settings.credential(kind);
            let model = settings.models.get(kind);
            let built: Result<Box<dyn GenerationBackend>, ProviderError> = match (kind, credential) {
                (ProviderKind::Ollama, host) if host.is_some() || primary == Some(kind) => {
                    OllamaBackend::new(host, model, timeout).map(|b| Box::new(b) as Box<dyn GenerationBackend>)
                }
                (ProviderKind::Ollama, None) => Err(ProviderError::MissingCredential("OLLAMA_HOST".into())),
                (ProviderKind::Gemini, Some(key)) => {
                    GeminiBackend::new(key, model, timeout).map(|b| Box::new(b) as Box<dyn GenerationBackend>)
                }
                (_, Some(key)) => ChatCompletionsBackend::for_kind(kind, key, model, timeout)
                    .map(|b| Box::new(b) as Box<dyn GenerationBackend>),
                (_, None) => Err(ProviderError::MissingCredential(credential_var(kind).into())),
            };
            match built {
                Ok(backend) => {
                    descriptors.push(ProviderDescriptor { name: kind.as_str().into(), enabled: true, reason: None });
                    backends.push(backend);
                }
                Err(ProviderError::MissingCredential(var)) => {
                    debug!(provider = kind.as_str(), "{var} not set, provider skipped");
                    descriptors.push(ProviderDescriptor {
                        name: kind.as_str().into(),
                        enabled: false,
                        reason: Some(format!("{var} not set")),
                    });
                }
                Err(e) => {
                    warn!(provider = kind.as_str(), error = %e, "could not set up provider, skipping it");
                    descriptors.push(ProviderDescriptor {
                        name: kind.as_str().into(),
                        enabled: false,
                        reason: Some(e.to_string()),
                    });
                }
            }
        }

        let registry = Self { backends, descriptors };
        if registry.is_empty() {
            info!("no generation provider available, answers will be extractive");
        } else {
            info!(providers = ?registry.names(), "generation providers ready");
        }
        registry
    }

    pub fn backends(&self) -> &[Box<dyn GenerationBackend>] { &self.backends }
    pub fn descriptors(&self) -> &[ProviderDescriptor] { &self.descriptors }
    pub fn names(&self) -> Vec<&str> { self.backends.iter().map(|b| b.name()).collect() }
    pub fn len(&self) -> usize { self.backends.len() }
    pub fn is_empty(&self) -> bool { self.backends.is_empty() }
}

fn credential_var(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Groq => "GROQ_API_KEY",
        ProviderKind::Gemini => "GOOGLE_API_KEY",
        ProviderKind::OpenAi => "OPENAI_API_KEY",
        ProviderKind::Together => "TOGETHER_API_KEY",
        ProviderKind::HuggingFace => "HUGGINGFACE_API_KEY",
        ProviderKind::Ollama => "OLLAMA_HOST",
    }
}
