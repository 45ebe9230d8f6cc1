#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use travelkb_rag::{GenerationBackend, GenerationRequest, ProviderError};

/// What a fake backend does when asked to generate.
#[derive(Clone)]
pub enum Behavior {
    Reply(&'static str),
    Fail(ProviderError),
    /// Sleeps, then replies "muộn".
    Slow(Duration),
    Blank,
}

pub struct FakeBackend {
    pub name: &'static str,
    pub behavior: Behavior,
    pub calls: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn new(name: &'static str, behavior: Behavior) -> (Box<dyn GenerationBackend>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Box::new(Self { name, behavior, calls: Arc::clone(&calls) }), calls)
    }
}

#[async_trait]
impl GenerationBackend for FakeBackend {
    fn name(&self) -> &str { self.name }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Reply(text) => Ok((*text).to_string()),
            Behavior::Fail(e) => Err(e.clone()),
            Behavior::Slow(d) => {
                tokio::time::sleep(*d).await;
                Ok("muộn".into())
            }
            Behavior::Blank => Ok("   ".into()),
        }
    }
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize { counter.load(Ordering::SeqCst) }
