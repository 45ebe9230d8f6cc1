//! Core types for the province knowledge assistant: records and chunks, the
//! corpus loader, the location alias resolver, configuration, errors and the
//! encoder seam.

pub mod alias;
pub mod config;
pub mod corpus;
pub mod error;
pub mod text;
pub mod traits;
pub mod types;

pub use alias::AliasTable;
pub use config::{Config, Settings};
pub use corpus::Corpus;
pub use error::{Error, Result};
pub use traits::Embedder;
pub use types::{Chunk, FieldCategory, ProvinceRecord, RetrievalResult, ScoredChunk};
