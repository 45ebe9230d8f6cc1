//! Deterministic bag-of-words encoder.
//!
//! Each distinct normalized word sets one bucket (`xxh64(word) % dim`) to 1,
//! and the vector is L2-normalized, so cosine similarity is the word overlap
//! divided by the geometric mean of the two vocabularies. Needs no model
//! files, which makes it the offline default and the stand-in for the
//! transformer in tests.

use std::collections::BTreeSet;
use std::hash::Hasher;

use anyhow::Result;
use twox_hash::XxHash64;

use travelkb_core::text::words;
use travelkb_core::traits::Embedder;

pub struct HashingEncoder {
    id: String,
    dim: usize,
    max_len: usize,
}

impl HashingEncoder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { id: format!("hashing:d{dim}"), dim, max_len: 512 }
    }

    fn bucket(&self, word: &str) -> usize {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(word.as_bytes());
        (hasher.finish() % self.dim as u64) as usize
    }

    pub fn encode(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let vocab: BTreeSet<String> = words(text).into_iter().take(self.max_len).collect();
        for word in &vocab { v[self.bucket(word)] = 1.0; }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 { for x in &mut v { *x /= norm; } }
        v
    }
}

impl Embedder for HashingEncoder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.encode(t)).collect())
    }
}
