//! Embedding index and semantic retriever.

pub mod cache;
pub mod index;
pub mod retriever;

pub use cache::QueryCache;
pub use index::EmbeddingIndex;
pub use retriever::Retriever;
