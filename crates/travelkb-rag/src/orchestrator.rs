//! Entry point for one incoming message on the fallback path.
//!
//! Steps, first terminal state wins:
//! 1. a province named in the message (or in the location entity) is
//!    answered straight from its record,
//! 2. turns the classifier handled confidently are left to other handlers,
//! 3. messages under two words get a clarification prompt,
//! 4. the alias-normalized message is retrieved,
//! 5. a low top score declines with a no-data message,
//! 6. otherwise the synthesizer answers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use travelkb_core::config::LocationPolicy;
use travelkb_core::text;
use travelkb_core::types::RetrievalResult;
use travelkb_core::{AliasTable, Corpus, Settings};
use travelkb_vector::Retriever;

use crate::gate::ConfidenceGate;
use crate::scope::IntentScope;
use crate::synthesize::{Answer, SynthesisError, Synthesizer};
use crate::templates::{self, Topic};

/// Entity kinds that carry a location.
const LOCATION_KINDS: [&str; 2] = ["location", "province"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: String,
    pub value: String,
}

/// One user message with whatever the upstream classifier attached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub text: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl Turn {
    pub fn new(text: impl Into<String>) -> Self { Self { text: text.into(), ..Self::default() } }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_entity(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        self.entities.push(Entity { kind: kind.into(), value: value.into() });
        self
    }

    pub fn location(&self) -> Option<&str> {
        self.entities
            .iter()
            .find(|e| LOCATION_KINDS.contains(&e.kind.as_str()) && !e.value.trim().is_empty())
            .map(|e| e.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Templated answer from a province record.
    Direct { province: String, topic: Topic, text: String },
    Clarify(String),
    NoData(String),
    UnknownProvince { name: String, text: String },
    Synthesized(Answer),
    SynthesisFailed(String),
    /// Not ours to answer.
    Deferred,
}

impl Reply {
    /// Text to send back; `None` when the turn was deferred.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Direct { text, .. } | Self::UnknownProvince { text, .. } => Some(text),
            Self::Clarify(t) | Self::NoData(t) | Self::SynthesisFailed(t) => Some(t),
            Self::Synthesized(a) => Some(&a.text),
            Self::Deferred => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::Clarify(_) => "clarify",
            Self::NoData(_) => "no_data",
            Self::UnknownProvince { .. } => "unknown_province",
            Self::Synthesized(_) => "synthesized",
            Self::SynthesisFailed(_) => "synthesis_failed",
            Self::Deferred => "deferred",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorOptions {
    pub threshold: f32,
    pub top_k: usize,
    pub policy: LocationPolicy,
}

impl OrchestratorOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self { threshold: settings.confidence_threshold, top_k: settings.top_k, policy: settings.location_policy }
    }
}

/// A location found for the quick path, plus the message words left once
/// the location itself is taken out.
struct Located {
    canonical: String,
    rest: Vec<String>,
}

enum Route {
    Done(Reply),
    Synthesize(RetrievalResult),
}

pub struct Orchestrator {
    corpus: Arc<Corpus>,
    aliases: Arc<AliasTable>,
    retriever: Arc<Retriever>,
    synthesizer: Synthesizer,
    gate: ConfidenceGate,
    top_k: usize,
    policy: LocationPolicy,
}

impl Orchestrator {
    pub fn new(
        corpus: Arc<Corpus>,
        aliases: Arc<AliasTable>,
        retriever: Arc<Retriever>,
        synthesizer: Synthesizer,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            corpus,
            aliases,
            retriever,
            synthesizer,
            gate: ConfidenceGate::new(options.threshold),
            top_k: options.top_k,
            policy: options.policy,
        }
    }

    pub fn corpus(&self) -> &Corpus { &self.corpus }
    pub fn aliases(&self) -> &AliasTable { &self.aliases }
    pub fn retriever(&self) -> &Retriever { &self.retriever }
    pub fn synthesizer(&self) -> &Synthesizer { &self.synthesizer }
    pub fn gate(&self) -> ConfidenceGate { self.gate }

    /// Blocking entry point. Safe on a multi-thread tokio runtime; hosts on a
    /// current-thread runtime should use `handle_async`.
    pub fn handle(&self, turn: &Turn) -> Reply {
        match self.route(turn) {
            Route::Done(reply) => reply,
            Route::Synthesize(retrieval) => self.settle(turn, self.synthesizer.synthesize(&turn.text, &retrieval)),
        }
    }

    /// Same steps as `handle`, awaiting the providers on the caller's runtime.
    /// Query encoding still runs inline.
    pub async fn handle_async(&self, turn: &Turn) -> Reply {
        match self.route(turn) {
            Route::Done(reply) => reply,
            Route::Synthesize(retrieval) => {
                let outcome = self.synthesizer.synthesize_async(&turn.text, &retrieval).await;
                self.settle(turn, outcome)
            }
        }
    }

    fn route(&self, turn: &Turn) -> Route {
        if let Some(reply) = self.quick_answer(turn) { return Route::Done(reply); }

        let scope = IntentScope::from_label(turn.intent.as_deref());
        if !scope.engages_fallback() {
            debug!(intent = ?turn.intent, "in-scope intent, deferring");
            return Route::Done(Reply::Deferred);
        }

        if text::word_count(&turn.text) < 2 {
            return Route::Done(Reply::Clarify(templates::ASK_MORE_DETAIL.to_string()));
        }

        let query = self.aliases.rewrite(&turn.text);
        let retrieval = self.retriever.search(&query, self.top_k);
        if !self.gate.admits(&retrieval) {
            info!(top = ?retrieval.top_score(), threshold = self.gate.threshold(), "below confidence threshold, declining");
            return Route::Done(Reply::NoData(templates::NO_CONFIDENT_DATA.to_string()));
        }
        Route::Synthesize(retrieval)
    }

    fn settle(&self, turn: &Turn, outcome: Result<Answer, SynthesisError>) -> Reply {
        match outcome {
            Ok(answer) => Reply::Synthesized(answer),
            Err(e) => {
                let providers = self.synthesizer.registry().names();
                error!(error = %e, ?providers, query = %turn.text, "answer synthesis failed");
                Reply::SynthesisFailed(templates::SYNTHESIS_FAILED.to_string())
            }
        }
    }

    /// Templated reply for a classified knowledge intent and its location
    /// entity.
    pub fn lookup(&self, intent: &str, location: Option<&str>) -> Reply {
        let Some(raw) = location.map(str::trim).filter(|l| !l.is_empty()) else {
            return Reply::Clarify(templates::ASK_WHICH_PROVINCE.to_string());
        };
        let canonical = self.aliases.resolve(raw);
        let Some(record) = self.corpus.get(&canonical) else {
            info!(location = raw, resolved = %canonical, "no record for location");
            return Reply::UnknownProvince {
                text: templates::unknown_province(&canonical, &self.corpus),
                name: canonical,
            };
        };
        let topic = Topic::from_intent(intent);
        Reply::Direct { province: record.name.clone(), topic, text: templates::render(topic, record) }
    }

    fn quick_answer(&self, turn: &Turn) -> Option<Reply> {
        let located = self.locate(turn)?;
        let record = self.corpus.get(&located.canonical)?;
        let topic = Topic::detect_words(&located.rest);
        debug!(province = %record.name, topic = topic.as_str(), "answering from record");
        Some(Reply::Direct { province: record.name.clone(), topic, text: templates::render(topic, record) })
    }

    /// First location with a record, in policy order. A recognized place
    /// without a record falls through to the other source.
    fn locate(&self, turn: &Turn) -> Option<Located> {
        let known = |located: Option<Located>| {
            located.filter(|l| {
                let found = self.corpus.contains(&l.canonical);
                if !found { debug!(province = %l.canonical, "location recognized but not in corpus"); }
                found
            })
        };
        match self.policy {
            LocationPolicy::LongestMatch => {
                known(self.from_message(&turn.text)).or_else(|| known(self.from_entity(turn)))
            }
            LocationPolicy::EntityFirst => {
                known(self.from_entity(turn)).or_else(|| known(self.from_message(&turn.text)))
            }
        }
    }

    fn from_message(&self, message: &str) -> Option<Located> {
        let m = self.aliases.find_in(message)?;
        let mut rest = text::words(message);
        rest.drain(m.start..(m.start + m.len).min(rest.len()));
        Some(Located { canonical: m.canonical, rest })
    }

    fn from_entity(&self, turn: &Turn) -> Option<Located> {
        let value = turn.location()?;
        let mut rest = text::words(&turn.text);
        let needle = text::words(value);
        if let Some(at) = text::find_phrase(&rest, &needle) {
            rest.drain(at..at + needle.len());
        }
        Some(Located { canonical: self.aliases.resolve(value), rest })
    }
}
