mod support;

use std::time::{Duration, Instant};

use support::{calls, Behavior, FakeBackend};
use travelkb_core::types::{Chunk, FieldCategory, RetrievalResult, ScoredChunk};
use travelkb_rag::{AnswerSource, ProviderError, ProviderRegistry, SynthesisError, SynthesisOptions, Synthesizer};

fn retrieval() -> RetrievalResult {
    let hit = |score: f32, province: &str, title: &str, text: &str| ScoredChunk {
        score,
        chunk: Chunk {
            id: format!("{province}/what_to_eat#0"),
            province: province.into(),
            category: FieldCategory::Food,
            title: title.into(),
            text: text.into(),
        },
    };
    RetrievalResult::new(vec![
        hit(0.71, "Đà Nẵng", "Mì Quảng", "Mì Quảng: Sợi mì vàng, nước dùng đậm đà."),
        hit(0.52, "Huế", "Bún bò Huế", "Bún bò Huế: Cay nồng, thơm mùi sả."),
    ])
}

fn options(attempt_ms: u64, budget_ms: u64) -> SynthesisOptions {
    SynthesisOptions {
        attempt_timeout: Duration::from_millis(attempt_ms),
        total_budget: Duration::from_millis(budget_ms),
        ..SynthesisOptions::default()
    }
}

#[test]
fn every_provider_failing_degrades_to_top_chunk() {
    let (a, _) = FakeBackend::new("a", Behavior::Fail(ProviderError::Auth(401)));
    let (b, _) = FakeBackend::new("b", Behavior::Fail(ProviderError::RateLimited));
    let synth = Synthesizer::new(ProviderRegistry::new(vec![a, b]), SynthesisOptions::default());

    let answer = synth.synthesize("Đà Nẵng ăn gì", &retrieval()).unwrap();
    assert_eq!(answer.text, "Đà Nẵng: Mì Quảng: Sợi mì vàng, nước dùng đậm đà.");
    assert_eq!(answer.source, AnswerSource::Extractive { province: "Đà Nẵng".into() });
    let failed: Vec<(&str, &ProviderError)> = answer.failures.iter().map(|f| (f.provider.as_str(), &f.error)).collect();
    assert_eq!(failed, vec![("a", &ProviderError::Auth(401)), ("b", &ProviderError::RateLimited)]);
}

#[test]
fn first_success_wins_and_later_providers_are_not_called() {
    let (a, _) = FakeBackend::new("a", Behavior::Fail(ProviderError::Http("502".into())));
    let (b, b_calls) = FakeBackend::new("b", Behavior::Reply("  Nên thử Mì Quảng.  "));
    let (c, c_calls) = FakeBackend::new("c", Behavior::Reply("không dùng"));
    let synth = Synthesizer::new(ProviderRegistry::new(vec![a, b, c]), SynthesisOptions::default());

    let answer = synth.synthesize("Đà Nẵng ăn gì", &retrieval()).unwrap();
    assert_eq!(answer.text, "Nên thử Mì Quảng.");
    assert_eq!(answer.source, AnswerSource::Generated { provider: "b".into() });
    assert_eq!(answer.failures.len(), 1);
    assert_eq!((calls(&b_calls), calls(&c_calls)), (1, 0));
}

#[test]
fn slow_provider_times_out_and_sequence_advances() {
    let (slow, _) = FakeBackend::new("slow", Behavior::Slow(Duration::from_secs(5)));
    let (fast, _) = FakeBackend::new("fast", Behavior::Reply("Mì Quảng"));
    let synth = Synthesizer::new(ProviderRegistry::new(vec![slow, fast]), options(50, 10_000));

    let started = Instant::now();
    let answer = synth.synthesize("Đà Nẵng ăn gì", &retrieval()).unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(answer.source, AnswerSource::Generated { provider: "fast".into() });
    assert_eq!(answer.failures[0].error, ProviderError::Timeout(Duration::from_millis(50)));
}

#[test]
fn blank_output_counts_as_failure() {
    let (blank, _) = FakeBackend::new("blank", Behavior::Blank);
    let (ok, _) = FakeBackend::new("ok", Behavior::Reply("Bún chả cá"));
    let synth = Synthesizer::new(ProviderRegistry::new(vec![blank, ok]), SynthesisOptions::default());

    let answer = synth.synthesize("ăn gì", &retrieval()).unwrap();
    assert_eq!(answer.text, "Bún chả cá");
    assert_eq!(answer.failures[0].error, ProviderError::Empty);
}

#[test]
fn overall_budget_caps_the_chain() {
    let (s1, _) = FakeBackend::new("s1", Behavior::Slow(Duration::from_secs(5)));
    let (s2, _) = FakeBackend::new("s2", Behavior::Slow(Duration::from_secs(5)));
    let (last, last_calls) = FakeBackend::new("last", Behavior::Reply("quá muộn"));
    let synth = Synthesizer::new(ProviderRegistry::new(vec![s1, s2, last]), options(100, 120));

    let answer = synth.synthesize("ăn gì", &retrieval()).unwrap();
    assert!(answer.is_extractive());
    assert_eq!(answer.failures.len(), 2);
    assert_eq!(calls(&last_calls), 0);
}

#[test]
fn no_providers_means_extractive_without_failures() {
    let synth = Synthesizer::new(ProviderRegistry::empty(), SynthesisOptions::default());
    let answer = synth.synthesize("ăn gì", &retrieval()).unwrap();
    assert!(answer.is_extractive());
    assert!(answer.failures.is_empty());
}

#[test]
fn empty_retrieval_is_an_error_not_an_empty_answer() {
    let synth = Synthesizer::new(ProviderRegistry::empty(), SynthesisOptions::default());
    assert!(matches!(synth.synthesize("ăn gì", &RetrievalResult::empty()), Err(SynthesisError::NothingRetrieved)));
}

#[tokio::test]
async fn async_entry_point_inside_a_runtime() {
    let (ok, _) = FakeBackend::new("ok", Behavior::Reply("Cao lầu"));
    let synth = Synthesizer::new(ProviderRegistry::new(vec![ok]), SynthesisOptions::default());
    let answer = synth.synthesize_async("Hội An ăn gì", &retrieval()).await.unwrap();
    assert_eq!(answer.text, "Cao lầu");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_entry_point_on_a_multi_thread_runtime() {
    let (ok, _) = FakeBackend::new("ok", Behavior::Reply("Bánh xèo"));
    let synth = Synthesizer::new(ProviderRegistry::new(vec![ok]), SynthesisOptions::default());
    let answer = synth.synthesize("ăn gì", &retrieval()).unwrap();
    assert_eq!(answer.source, AnswerSource::Generated { provider: "ok".into() });
}

#[tokio::test]
async fn blocking_entry_point_on_a_current_thread_runtime_is_an_error() {
    let (ok, ok_calls) = FakeBackend::new("ok", Behavior::Reply("Bánh xèo"));
    let synth = Synthesizer::new(ProviderRegistry::new(vec![ok]), SynthesisOptions::default());
    assert!(matches!(synth.synthesize("ăn gì", &retrieval()), Err(SynthesisError::Runtime(_))));
    assert_eq!(calls(&ok_calls), 0);
}
