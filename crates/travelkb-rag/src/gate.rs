use travelkb_core::types::RetrievalResult;

/// Whether a top similarity score is high enough to answer from.
/// Inclusive at the threshold; NaN never passes.
pub fn should_answer(top_score: f32, threshold: f32) -> bool { top_score >= threshold }

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl ConfidenceGate {
    pub fn new(threshold: f32) -> Self { Self { threshold } }

    pub fn threshold(&self) -> f32 { self.threshold }

    /// An empty result is never admitted.
    pub fn admits(&self, result: &RetrievalResult) -> bool {
        result.top_score().is_some_and(|s| should_answer(s, self.threshold))
    }
}
