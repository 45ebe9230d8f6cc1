use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("Malformed JSON in {label}: {source}")]
    Json { label: String, #[source] source: serde_json::Error },

    #[error("Invalid record '{province}' in {label}: {reason}")]
    InvalidRecord { label: String, province: String, reason: String },

    #[error("Knowledge corpus is empty: no province record could be loaded")]
    EmptyCorpus,

    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
