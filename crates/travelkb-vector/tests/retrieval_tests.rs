use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use travelkb_core::traits::Embedder;
use travelkb_core::types::{Chunk, FieldCategory};
use travelkb_core::{AliasTable, Corpus};
use travelkb_embed::HashingEncoder;
use travelkb_vector::{EmbeddingIndex, Retriever};

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap().to_path_buf()
}

fn sample_retriever() -> Retriever {
    let corpus = Corpus::load_dir(&repo_root().join("data/provinces")).expect("sample corpus");
    let encoder: Arc<dyn Embedder> = Arc::new(HashingEncoder::new(4096));
    let index = EmbeddingIndex::build(&corpus, encoder.as_ref()).expect("index");
    Retriever::new(Arc::new(index), encoder).expect("retriever")
}

#[test]
fn same_query_same_ranking() {
    let r = sample_retriever();
    let a = r.search("lễ hội pháo hoa", 5);
    let b = r.search("lễ hội pháo hoa", 5);
    assert_eq!(a, b);
    assert_eq!(a.len(), 5);
    assert!(a.hits.windows(2).all(|w| w[0].score >= w[1].score), "ranked highest first");
}

#[test]
fn cuisine_query_lands_on_province_food() {
    let r = sample_retriever();
    let result = r.search("Ẩm thực Đà Nẵng có gì ngon", 5);
    let top: Vec<String> = result.iter().take(4).map(|h| h.chunk.tag()).collect();
    assert!(top.iter().all(|t| t == "Đà Nẵng/what_to_eat"), "got {top:?}");
    assert!(result.top_score().unwrap() > 0.3);
}

#[test]
fn merged_province_alias_scopes_results_to_new_province() {
    let aliases = AliasTable::builtin().unwrap();
    let query = aliases.rewrite("Bình Dương có gì chơi");
    assert_eq!(query, "Hồ Chí Minh có gì chơi");
    let result = sample_retriever().search(&query, 5);
    assert_eq!(result.len(), 5);
    assert!(result.iter().all(|h| h.chunk.province == "Hồ Chí Minh"), "got {:?}", result.iter().map(|h| h.chunk.tag()).collect::<Vec<_>>());
}

#[test]
fn top_k_bounds() {
    let r = sample_retriever();
    assert!(r.search("Huế", 0).is_empty());
    let total = r.index().len();
    assert_eq!(r.search("Huế", total + 10).len(), total);
}

#[test]
fn cached_and_uncached_results_match() {
    let corpus = Corpus::load_dir(&repo_root().join("data/provinces")).unwrap();
    let encoder: Arc<dyn Embedder> = Arc::new(HashingEncoder::new(1024));
    let index = Arc::new(EmbeddingIndex::build(&corpus, encoder.as_ref()).unwrap());
    let plain = Retriever::new(Arc::clone(&index), Arc::clone(&encoder)).unwrap();
    let cached = Retriever::new(index, encoder).unwrap().with_cache(8);
    for _ in 0..2 {
        assert_eq!(plain.search("đặc sản làm quà Huế", 3), cached.search("đặc sản làm quà Huế", 3));
    }
}

/// Same vector for every text, so every score ties.
struct Constant;
impl Embedder for Constant {
    fn id(&self) -> &str { "constant:d3" }
    fn dim(&self) -> usize { 3 }
    fn max_len(&self) -> usize { 8 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 1.0, 1.0]).collect())
    }
}

fn chunks(n: usize) -> Vec<Chunk> {
    (0..n)
        .map(|i| Chunk {
            id: format!("P/culture_details#{i}"),
            province: "P".into(),
            category: FieldCategory::Culture,
            title: String::new(),
            text: format!("đoạn {i}"),
        })
        .collect()
}

#[test]
fn exact_ties_keep_insertion_order() {
    let index = EmbeddingIndex::from_chunks(chunks(6), &Constant, false).unwrap();
    let r = Retriever::new(Arc::new(index), Arc::new(Constant)).unwrap();
    let ids: Vec<String> = r.search("bất kỳ", 4).iter().map(|h| h.chunk.id.clone()).collect();
    assert_eq!(ids, vec!["P/culture_details#0", "P/culture_details#1", "P/culture_details#2", "P/culture_details#3"]);
}

/// Succeeds while building the index, then fails every query.
struct Flaky {
    broken: AtomicBool,
    calls: AtomicUsize,
}
impl Embedder for Flaky {
    fn id(&self) -> &str { "constant:d3" }
    fn dim(&self) -> usize { 3 }
    fn max_len(&self) -> usize { 8 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.load(Ordering::SeqCst) { anyhow::bail!("model crashed"); }
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }
}

#[test]
fn encoder_failure_yields_empty_result() {
    let flaky = Arc::new(Flaky { broken: AtomicBool::new(false), calls: AtomicUsize::new(0) });
    let index = EmbeddingIndex::from_chunks(chunks(3), flaky.as_ref(), false).unwrap();
    let r = Retriever::new(Arc::new(index), flaky.clone()).unwrap();
    flaky.broken.store(true, Ordering::SeqCst);
    assert!(r.search("Huế", 3).is_empty());
    assert!(flaky.calls.load(Ordering::SeqCst) >= 2);
}

#[test]
fn mismatched_encoder_is_rejected() {
    let index = EmbeddingIndex::from_chunks(chunks(2), &Constant, false).unwrap();
    let other: Arc<dyn Embedder> = Arc::new(HashingEncoder::new(3));
    assert!(Retriever::new(Arc::new(index), other).is_err());
}

#[test]
fn empty_index_returns_nothing() {
    let index = EmbeddingIndex::from_chunks(Vec::new(), &Constant, false).unwrap();
    let r = Retriever::new(Arc::new(index), Arc::new(Constant)).unwrap();
    assert!(r.search("Huế", 5).is_empty());
}
