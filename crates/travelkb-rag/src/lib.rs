//! Fallback answering: confidence gate, answer synthesis over a chain of
//! generation providers, and the orchestrator tying them to retrieval.

pub mod context;
pub mod gate;
pub mod orchestrator;
pub mod provider;
pub mod scope;
pub mod synthesize;
pub mod templates;

pub use gate::ConfidenceGate;
pub use orchestrator::{Entity, Orchestrator, OrchestratorOptions, Reply, Turn};
pub use provider::{GenerationBackend, GenerationRequest, ProviderError, ProviderRegistry};
pub use scope::IntentScope;
pub use synthesize::{Answer, AnswerSource, AttemptFailure, SynthesisError, SynthesisOptions, Synthesizer};
pub use templates::Topic;
