//! Layered configuration and path helpers.
//!
//! Uses Figment to merge, lowest precedence first: compiled defaults,
//! `config.toml`, `config.<env>.toml`, `APP_*` env vars, then the bare
//! variables the host environment sets (`CONFIDENCE_THRESHOLD`,
//! `GENERATION_PROVIDER`, provider API keys, `OLLAMA_HOST`). Provides helpers
//! to expand `~` and `${VAR}` and to resolve relative paths against a known
//! base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.55;

const CREDENTIAL_VARS: &[&str] = &[
    "GROQ_API_KEY",
    "OPENAI_API_KEY",
    "GOOGLE_API_KEY",
    "TOGETHER_API_KEY",
    "HUGGINGFACE_API_KEY",
    "OLLAMA_HOST",
];

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Ok(Self { figment: Self::figment_for(&env_name) })
    }

    /// The full provider stack for `env_name`, without reading anything yet.
    pub fn figment_for(env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment
            .merge(Env::prefixed("APP_").split("__"))
            // names used by older deployments, below their current spellings
            .merge(
                Env::raw()
                    .only(&["RAG_CONFIDENCE_THRESHOLD", "LLM_PROVIDER"])
                    .map(|k| if k.as_str().eq_ignore_ascii_case("llm_provider") { "generation_provider".into() } else { "confidence_threshold".into() }),
            )
            .merge(Env::raw().only(&["CONFIDENCE_THRESHOLD", "GENERATION_PROVIDER"]))
            .merge(Env::raw().only(CREDENTIAL_VARS))
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    /// Extract and validate the full settings struct.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    Transformer,
    Hashing,
}

/// How the fallback path picks the location when both an extracted entity
/// and an alias mention in the message are available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPolicy {
    /// Longest alias found in the message text, entity only as a fallback.
    #[default]
    LongestMatch,
    /// The classifier's entity when present, message scan otherwise.
    EntityFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Groq,
    Gemini,
    OpenAi,
    Together,
    HuggingFace,
    Ollama,
}

impl ProviderKind {
    /// Attempt order when no primary is named.
    pub const DEFAULT_ORDER: [ProviderKind; 6] =
        [Self::Groq, Self::Gemini, Self::OpenAi, Self::Together, Self::HuggingFace, Self::Ollama];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Together => "together",
            Self::HuggingFace => "huggingface",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ProviderKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "together" => Ok(Self::Together),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "ollama" => Ok(Self::Ollama),
            other => Err(Error::InvalidConfig(format!("unknown generation provider '{other}'"))),
        }
    }
}

/// Value of `generation_provider`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProviderPreference {
    #[default]
    Auto,
    /// Generation disabled; answers are extractive only.
    Disabled,
    Primary(ProviderKind),
}

impl ProviderPreference {
    /// Providers in attempt order: the primary first, then the rest of the
    /// default order.
    pub fn order(self) -> Vec<ProviderKind> {
        match self {
            Self::Disabled => Vec::new(),
            Self::Auto => ProviderKind::DEFAULT_ORDER.to_vec(),
            Self::Primary(p) => std::iter::once(p)
                .chain(ProviderKind::DEFAULT_ORDER.into_iter().filter(move |k| *k != p))
                .collect(),
        }
    }
}

impl TryFrom<String> for ProviderPreference {
    type Error = Error;
    fn try_from(s: String) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "none" | "off" | "extractive" => Ok(Self::Disabled),
            other => other.parse().map(Self::Primary),
        }
    }
}

impl From<ProviderPreference> for String {
    fn from(p: ProviderPreference) -> Self {
        match p {
            ProviderPreference::Auto => "auto".into(),
            ProviderPreference::Disabled => "none".into(),
            ProviderPreference::Primary(k) => k.as_str().into(),
        }
    }
}

/// Model name overrides per generation provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderModels {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub together: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub huggingface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama: Option<String>,
}

impl ProviderModels {
    pub fn get(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::Groq => self.groq.as_deref(),
            ProviderKind::Gemini => self.gemini.as_deref(),
            ProviderKind::OpenAi => self.openai.as_deref(),
            ProviderKind::Together => self.together.as_deref(),
            ProviderKind::HuggingFace => self.huggingface.as_deref(),
            ProviderKind::Ollama => self.ollama.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub confidence_threshold: f32,
    pub top_k: usize,
    pub generation_provider: ProviderPreference,
    pub corpus_dir: String,
    pub alias_file: String,
    /// Unset means transformer when `model_dir` is given, hashing otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder: Option<EncoderKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<String>,
    pub hashing_dim: usize,
    pub max_seq_len: usize,
    pub max_context_chars: usize,
    pub provider_timeout_secs: u64,
    pub synthesis_budget_secs: u64,
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// Query-embedding cache entries; 0 disables the cache.
    pub query_cache_capacity: u64,
    pub location_policy: LocationPolicy,
    pub models: ProviderModels,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groq_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub together_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub huggingface_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_host: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            top_k: 5,
            generation_provider: ProviderPreference::Auto,
            corpus_dir: "data/provinces".into(),
            alias_file: "data/aliases.json".into(),
            encoder: None,
            model_dir: None,
            hashing_dim: 512,
            max_seq_len: 256,
            max_context_chars: 3000,
            provider_timeout_secs: 12,
            synthesis_budget_secs: 30,
            max_output_tokens: 512,
            temperature: 0.3,
            query_cache_capacity: 256,
            location_policy: LocationPolicy::LongestMatch,
            models: ProviderModels::default(),
            groq_api_key: None,
            openai_api_key: None,
            google_api_key: None,
            together_api_key: None,
            huggingface_api_key: None,
            ollama_host: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if !self.confidence_threshold.is_finite() {
            return Err(Error::InvalidConfig(format!("confidence_threshold must be finite, got {}", self.confidence_threshold)));
        }
        if self.top_k == 0 { return Err(Error::InvalidConfig("top_k must be at least 1".into())); }
        if self.provider_timeout_secs == 0 { return Err(Error::InvalidConfig("provider_timeout_secs must be > 0".into())); }
        if self.synthesis_budget_secs == 0 { return Err(Error::InvalidConfig("synthesis_budget_secs must be > 0".into())); }
        if self.hashing_dim == 0 || self.max_seq_len == 0 {
            return Err(Error::InvalidConfig("hashing_dim and max_seq_len must be > 0".into()));
        }
        if !self.temperature.is_finite() { return Err(Error::InvalidConfig("temperature must be finite".into())); }
        Ok(())
    }

    pub fn encoder_kind(&self) -> EncoderKind {
        self.encoder.unwrap_or(if self.model_dir.is_some() { EncoderKind::Transformer } else { EncoderKind::Hashing })
    }

    /// API key (or host, for ollama) for `kind`; blank values count as absent.
    pub fn credential(&self, kind: ProviderKind) -> Option<&str> {
        let v = match kind {
            ProviderKind::Groq => &self.groq_api_key,
            ProviderKind::Gemini => &self.google_api_key,
            ProviderKind::OpenAi => &self.openai_api_key,
            ProviderKind::Together => &self.together_api_key,
            ProviderKind::HuggingFace => &self.huggingface_api_key,
            ProviderKind::Ollama => &self.ollama_host,
        };
        v.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn corpus_path(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.corpus_dir) }
    pub fn alias_path(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.alias_file) }
    pub fn model_path(&self, base: &Path) -> Option<PathBuf> { self.model_dir.as_deref().map(|d| resolve_with_base(base, d)) }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        s.validate().unwrap();
        assert_eq!(s.confidence_threshold, 0.55);
        assert_eq!(s.encoder_kind(), EncoderKind::Hashing);
        assert_eq!(s.generation_provider.order().first(), Some(&ProviderKind::Groq));
    }

    #[test]
    fn toml_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(
            r#"
            top_k = 3
            generation_provider = "gemini"
            location_policy = "entity_first"
            model_dir = "/models/xlmr"
            [models]
            gemini = "gemini-1.5-flash"
            "#,
        ));
        let s = Config::from_figment(figment).settings().unwrap();
        assert_eq!(s.top_k, 3);
        assert_eq!(s.generation_provider, ProviderPreference::Primary(ProviderKind::Gemini));
        assert_eq!(s.location_policy, LocationPolicy::EntityFirst);
        assert_eq!(s.encoder_kind(), EncoderKind::Transformer);
        assert_eq!(s.models.get(ProviderKind::Gemini), Some("gemini-1.5-flash"));
        assert_eq!(s.confidence_threshold, 0.55);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string("top_k = 0"));
        assert!(matches!(Config::from_figment(figment).settings(), Err(Error::InvalidConfig(_))));
        let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(r#"generation_provider = "skynet""#));
        assert!(Config::from_figment(figment).settings().is_err());
    }

    #[test]
    fn bare_env_vars_override_files() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "confidence_threshold = 0.4\ntop_k = 7")?;
            jail.set_env("CONFIDENCE_THRESHOLD", "0.7");
            jail.set_env("GENERATION_PROVIDER", "none");
            jail.set_env("GROQ_API_KEY", "gsk-test");
            jail.set_env("GOOGLE_API_KEY", "   ");
            let s = Config::from_figment(Config::figment_for("dev")).settings().map_err(|e| e.to_string())?;
            assert_eq!(s.confidence_threshold, 0.7);
            assert_eq!(s.top_k, 7);
            assert_eq!(s.generation_provider, ProviderPreference::Disabled);
            assert_eq!(s.credential(ProviderKind::Groq), Some("gsk-test"));
            assert_eq!(s.credential(ProviderKind::Gemini), None);
            Ok(())
        });
    }

    #[test]
    fn legacy_names_rank_below_current_ones() {
        Jail::expect_with(|jail| {
            jail.set_env("RAG_CONFIDENCE_THRESHOLD", "0.3");
            jail.set_env("LLM_PROVIDER", "openai");
            let s = Config::from_figment(Config::figment_for("test")).settings().map_err(|e| e.to_string())?;
            assert_eq!(s.confidence_threshold, 0.3);
            assert_eq!(s.generation_provider, ProviderPreference::Primary(ProviderKind::OpenAi));
            jail.set_env("CONFIDENCE_THRESHOLD", "0.6");
            let s = Config::from_figment(Config::figment_for("test")).settings().map_err(|e| e.to_string())?;
            assert_eq!(s.confidence_threshold, 0.6);
            Ok(())
        });
    }

    #[test]
    fn primary_provider_leads_the_order() {
        let order = ProviderPreference::Primary(ProviderKind::OpenAi).order();
        assert_eq!(order[0], ProviderKind::OpenAi);
        assert_eq!(order.len(), 6);
        assert_eq!(order[1], ProviderKind::Groq);
        assert!(ProviderPreference::Disabled.order().is_empty());
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let s = Settings::default();
        assert_eq!(s.corpus_path(Path::new("/srv/app")), PathBuf::from("/srv/app/data/provinces"));
        assert_eq!(resolve_with_base(Path::new("/srv"), "/abs/x"), PathBuf::from("/abs/x"));
    }
}
