/// Text-to-vector encoder shared by index build and query time.
///
/// Implementations must return vectors of length `dim()` for every input and
/// be deterministic for a given `id()`. Two encoders with different ids must
/// never be mixed within one index.
pub trait Embedder: Send + Sync {
    /// Stable identifier, e.g. `hashing:d512` or `xlmr:<model dir>:d768`.
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("encoder {} returned no vector", self.id()))
    }
}
