//! Answer synthesis over the provider chain.
//!
//! Backends are tried strictly in registry order, one at a time. Each
//! attempt is bounded by `min(attempt_timeout, remaining budget)`; a slow
//! attempt is dropped and the next backend runs. When nothing generates a
//! non-empty answer the top retrieved chunk is returned verbatim, so a
//! non-empty retrieval always yields a non-empty answer.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};
use tokio::task::block_in_place;
use tracing::{debug, info, warn};
use travelkb_core::types::RetrievalResult;
use travelkb_core::Settings;

use crate::context::{build_context, build_prompt, SYSTEM_PROMPT};
use crate::provider::{GenerationRequest, ProviderError, ProviderRegistry};

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOptions {
    pub max_context_chars: usize,
    pub attempt_timeout: Duration,
    pub total_budget: Duration,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for SynthesisOptions {
    fn default() -> Self { Self::from_settings(&Settings::default()) }
}

impl SynthesisOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_context_chars: settings.max_context_chars,
            attempt_timeout: Duration::from_secs(settings.provider_timeout_secs),
            total_budget: Duration::from_secs(settings.synthesis_budget_secs),
            max_output_tokens: settings.max_output_tokens,
            temperature: settings.temperature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerSource {
    Generated { provider: String },
    /// Top chunk returned as is.
    Extractive { province: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub provider: String,
    pub error: ProviderError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
    /// Failed attempts before the answer was produced, in attempt order.
    pub failures: Vec<AttemptFailure>,
}

impl Answer {
    pub fn is_extractive(&self) -> bool { matches!(self.source, AnswerSource::Extractive { .. }) }
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("nothing was retrieved to answer from")]
    NothingRetrieved,
    #[error("synthesis runtime unavailable: {0}")]
    Runtime(String),
}

pub struct Synthesizer {
    registry: ProviderRegistry,
    options: SynthesisOptions,
    // Built on first blocking call so async callers never own one.
    runtime: OnceLock<Runtime>,
}

impl Synthesizer {
    pub fn new(registry: ProviderRegistry, options: SynthesisOptions) -> Self {
        Self { registry, options, runtime: OnceLock::new() }
    }

    pub fn registry(&self) -> &ProviderRegistry { &self.registry }
    pub fn options(&self) -> &SynthesisOptions { &self.options }

    /// Blocking entry point.
    ///
    /// Inside a multi-thread tokio runtime the current worker is handed over
    /// with `block_in_place` and the host runtime drives the attempts. A
    /// current-thread runtime cannot be blocked, so that case returns
    /// `SynthesisError::Runtime`; async hosts should call `synthesize_async`.
    pub fn synthesize(&self, question: &str, retrieval: &RetrievalResult) -> Result<Answer, SynthesisError> {
        if retrieval.is_empty() { return Err(SynthesisError::NothingRetrieved); }
        if self.registry.is_empty() { return extractive(retrieval, Vec::new()); }
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                block_in_place(|| handle.block_on(self.synthesize_async(question, retrieval)))
            }
            Ok(_) => Err(SynthesisError::Runtime(
                "blocking synthesis called on a current-thread runtime, use synthesize_async".into(),
            )),
            Err(_) => self.runtime()?.block_on(self.synthesize_async(question, retrieval)),
        }
    }

    pub async fn synthesize_async(&self, question: &str, retrieval: &RetrievalResult) -> Result<Answer, SynthesisError> {
        if retrieval.is_empty() { return Err(SynthesisError::NothingRetrieved); }
        let context = build_context(retrieval, self.options.max_context_chars);
        let request = GenerationRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt: build_prompt(question, &context),
            max_tokens: self.options.max_output_tokens,
            temperature: self.options.temperature,
        };

        let deadline = Instant::now() + self.options.total_budget;
        let mut failures = Vec::new();
        for backend in self.registry.backends() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(skipped = backend.name(), "synthesis budget spent, no more providers tried");
                break;
            }
            let limit = self.options.attempt_timeout.min(remaining);
            let outcome = match tokio::time::timeout(limit, backend.generate(&request)).await {
                Ok(Ok(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
                Ok(Ok(_)) => Err(ProviderError::Empty),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(ProviderError::Timeout(limit)),
            };
            match outcome {
                Ok(text) => {
                    debug!(provider = backend.name(), failed_before = failures.len(), "answer generated");
                    return Ok(Answer {
                        text,
                        source: AnswerSource::Generated { provider: backend.name().to_string() },
                        failures,
                    });
                }
                Err(error) => {
                    warn!(provider = backend.name(), kind = error.kind(), error = %error, "generation attempt failed");
                    failures.push(AttemptFailure { provider: backend.name().to_string(), error });
                }
            }
        }
        extractive(retrieval, failures)
    }

    fn runtime(&self) -> Result<&Runtime, SynthesisError> {
        if let Some(rt) = self.runtime.get() { return Ok(rt); }
        let rt = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("travelkb-synth")
            .enable_all()
            .build()
            .map_err(|e| SynthesisError::Runtime(e.to_string()))?;
        Ok(self.runtime.get_or_init(|| rt))
    }
}

fn extractive(retrieval: &RetrievalResult, failures: Vec<AttemptFailure>) -> Result<Answer, SynthesisError> {
    let top = retrieval.top().ok_or(SynthesisError::NothingRetrieved)?;
    info!(chunk = %top.chunk.id, attempts = failures.len(), "falling back to extractive answer");
    Ok(Answer {
        text: top.chunk.attributed(),
        source: AnswerSource::Extractive { province: top.chunk.province.clone() },
        failures,
    })
}
