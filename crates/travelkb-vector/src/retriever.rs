use std::sync::Arc;

use tracing::{debug, warn};

use travelkb_core::error::Error;
use travelkb_core::traits::Embedder;
use travelkb_core::types::{RetrievalResult, ScoredChunk};

use crate::cache::QueryCache;
use crate::index::{l2_normalize, EmbeddingIndex};

/// Top-k semantic search over a frozen index.
///
/// The query is encoded with the encoder the index was built with; scores
/// are cosine similarities, highest first, with exact ties kept in chunk
/// insertion order. Encoder failures yield an empty result rather than an
/// error.
pub struct Retriever {
    index: Arc<EmbeddingIndex>,
    embedder: Arc<dyn Embedder>,
    cache: Option<QueryCache>,
}

impl Retriever {
    pub fn new(index: Arc<EmbeddingIndex>, embedder: Arc<dyn Embedder>) -> Result<Self, Error> {
        if embedder.id() != index.encoder_id() {
            return Err(Error::InvalidConfig(format!(
                "index was built with encoder {} but queries would use {}",
                index.encoder_id(),
                embedder.id()
            )));
        }
        if embedder.dim() != index.dim() {
            return Err(Error::DimensionMismatch { expected: index.dim(), got: embedder.dim() });
        }
        Ok(Self { index, embedder, cache: None })
    }

    /// Memoize up to `capacity` query vectors; 0 leaves caching off.
    pub fn with_cache(mut self, capacity: u64) -> Self {
        self.cache = (capacity > 0).then(|| QueryCache::new(capacity));
        self
    }

    pub fn index(&self) -> &EmbeddingIndex { &self.index }

    pub fn search(&self, query: &str, top_k: usize) -> RetrievalResult {
        if top_k == 0 || self.index.is_empty() { return RetrievalResult::empty(); }
        let Some(q) = self.encode_query(query) else { return RetrievalResult::empty() };
        let scores = match self.index.scores(&q) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "query vector rejected by index");
                return RetrievalResult::empty();
            }
        };

        let key = |i: usize| if scores[i].is_nan() { f32::NEG_INFINITY } else { scores[i] };
        let mut order: Vec<usize> = (0..scores.len()).collect();
        // sort_by is stable: equal scores keep insertion order
        order.sort_by(|&a, &b| key(b).total_cmp(&key(a)));
        order.truncate(top_k);

        let hits: Vec<ScoredChunk> = order
            .into_iter()
            .filter_map(|i| self.index.chunk(i).map(|c| ScoredChunk { score: key(i), chunk: c.clone() }))
            .collect();
        debug!(query, hits = hits.len(), top = hits.first().map(|h| h.score), "retrieval done");
        RetrievalResult::new(hits)
    }

    fn encode_query(&self, query: &str) -> Option<Arc<Vec<f32>>> {
        let cache_key = self.cache.as_ref().map(|_| QueryCache::key(self.embedder.id(), query));
        if let (Some(cache), Some(k)) = (&self.cache, &cache_key) {
            if let Some(v) = cache.get(k) { return Some(v); }
        }
        let mut v = match self.embedder.embed(query) {
            Ok(v) => v,
            Err(e) => {
                warn!(encoder = self.embedder.id(), error = %e, "query encoding failed, returning no results");
                return None;
            }
        };
        if v.len() != self.index.dim() || v.iter().any(|x| !x.is_finite()) {
            warn!(encoder = self.embedder.id(), len = v.len(), "encoder returned a malformed query vector");
            return None;
        }
        l2_normalize(&mut v);
        let v = Arc::new(v);
        if let (Some(cache), Some(k)) = (&self.cache, cache_key) { cache.insert(k, Arc::clone(&v)); }
        Some(v)
    }
}
