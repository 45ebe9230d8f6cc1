//! In-memory exact nearest-neighbour index over corpus chunks.
//!
//! Every chunk is encoded once at build time; vectors are L2-normalized and
//! stored contiguously (`len * dim` floats), so cosine similarity is a dot
//! product over one slice. The index is frozen after `build`; a corpus change
//! means building a new one.

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use travelkb_core::error::Error;
use travelkb_core::traits::Embedder;
use travelkb_core::types::Chunk;
use travelkb_core::Corpus;

const BATCH_SIZE: usize = 32;

#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<f32>,
    dim: usize,
    encoder_id: String,
}

impl EmbeddingIndex {
    pub fn build(corpus: &Corpus, embedder: &dyn Embedder) -> Result<Self> {
        Self::from_chunks(corpus.chunks(), embedder, false)
    }

    /// Same as `build`, drawing a progress bar on stderr.
    pub fn build_with_progress(corpus: &Corpus, embedder: &dyn Embedder) -> Result<Self> {
        Self::from_chunks(corpus.chunks(), embedder, true)
    }

    pub fn from_chunks(chunks: Vec<Chunk>, embedder: &dyn Embedder, progress: bool) -> Result<Self> {
        let dim = embedder.dim();
        let pb = if progress { progress_bar(chunks.len()) } else { ProgressBar::hidden() };
        let mut vectors = Vec::with_capacity(chunks.len() * dim);

        for batch in chunks.chunks(BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(Chunk::embedding_text).collect();
            let embedded = embedder.embed_batch(&texts)?;
            if embedded.len() != texts.len() {
                return Err(anyhow!("encoder {} returned {} vectors for {} texts", embedder.id(), embedded.len(), texts.len()));
            }
            for mut v in embedded {
                if v.len() != dim { return Err(Error::DimensionMismatch { expected: dim, got: v.len() }.into()); }
                l2_normalize(&mut v);
                vectors.extend_from_slice(&v);
            }
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();

        info!(chunks = chunks.len(), dim, encoder = embedder.id(), "embedding index built");
        Ok(Self { chunks, vectors, dim, encoder_id: embedder.id().to_string() })
    }

    pub fn len(&self) -> usize { self.chunks.len() }
    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }
    pub fn dim(&self) -> usize { self.dim }
    pub fn encoder_id(&self) -> &str { &self.encoder_id }
    pub fn chunks(&self) -> &[Chunk] { &self.chunks }
    pub fn chunk(&self, i: usize) -> Option<&Chunk> { self.chunks.get(i) }

    pub fn vector(&self, i: usize) -> Option<&[f32]> {
        (i < self.len()).then(|| &self.vectors[i * self.dim..(i + 1) * self.dim])
    }

    /// Dot product of `query` (expected unit length) with every chunk, in
    /// insertion order.
    pub fn scores(&self, query: &[f32]) -> Result<Vec<f32>, Error> {
        if query.len() != self.dim { return Err(Error::DimensionMismatch { expected: self.dim, got: query.len() }); }
        if self.dim == 0 { return Ok(vec![0.0; self.len()]); }
        Ok(self
            .vectors
            .chunks_exact(self.dim)
            .map(|row| row.iter().zip(query).map(|(a, b)| a * b).sum())
            .collect())
    }
}

pub(crate) fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() { for x in v.iter_mut() { *x /= norm; } }
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use travelkb_core::types::FieldCategory;

    struct Axis;
    impl Embedder for Axis {
        fn id(&self) -> &str { "axis:d2" }
        fn dim(&self) -> usize { 2 }
        fn max_len(&self) -> usize { 16 }
        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| if t.contains("north") { vec![0.0, 3.0] } else { vec![4.0, 0.0] }).collect())
        }
    }

    struct Short;
    impl Embedder for Short {
        fn id(&self) -> &str { "short:d3" }
        fn dim(&self) -> usize { 3 }
        fn max_len(&self) -> usize { 16 }
        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|_| vec![1.0]).collect()) }
    }

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk { id: id.into(), province: "P".into(), category: FieldCategory::Culture, title: String::new(), text: text.into() }
    }

    #[test]
    fn vectors_are_stored_normalized_and_contiguous() {
        let idx = EmbeddingIndex::from_chunks(vec![chunk("a", "north"), chunk("b", "east")], &Axis, false).unwrap();
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.vector(0), Some(&[0.0, 1.0][..]));
        assert_eq!(idx.vector(1), Some(&[1.0, 0.0][..]));
        assert_eq!(idx.vector(2), None);
        assert_eq!(idx.scores(&[0.0, 1.0]).unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn wrong_dimension_fails_build_and_scoring() {
        let err = EmbeddingIndex::from_chunks(vec![chunk("a", "x")], &Short, false).unwrap_err();
        assert!(err.to_string().contains("dimension"));
        let idx = EmbeddingIndex::from_chunks(vec![chunk("a", "x")], &Axis, false).unwrap();
        assert!(matches!(idx.scores(&[1.0]), Err(Error::DimensionMismatch { expected: 2, got: 1 })));
    }
}
