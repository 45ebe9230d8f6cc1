//! Bounded memo of query vectors.
//!
//! Keys are blake3 hashes of the encoder id plus the exact query text, so a
//! hit returns the same vector the encoder would have produced.

use std::sync::Arc;

use moka::sync::Cache;

pub struct QueryCache {
    cache: Cache<String, Arc<Vec<f32>>>,
}

impl QueryCache {
    pub fn new(max_entries: u64) -> Self {
        Self { cache: Cache::builder().max_capacity(max_entries).build() }
    }

    pub fn key(encoder_id: &str, query: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(encoder_id.as_bytes());
        hasher.update(&[0]);
        hasher.update(query.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<f32>>> { self.cache.get(key) }

    pub fn insert(&self, key: String, vector: Arc<Vec<f32>>) { self.cache.insert(key, vector); }

    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
