/// How the upstream intent classifier labelled a turn, as far as the
/// fallback path is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentScope {
    /// A recognized in-domain intent; another handler owns the turn.
    InScope,
    /// The classifier's own fallback label, or no label at all.
    LowConfidence,
    OutOfScope,
}

pub const NLU_FALLBACK: &str = "nlu_fallback";
pub const OUT_OF_SCOPE: &str = "out_of_scope";

impl IntentScope {
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            None | Some("") | Some(NLU_FALLBACK) => Self::LowConfidence,
            Some(OUT_OF_SCOPE) => Self::OutOfScope,
            Some(_) => Self::InScope,
        }
    }

    pub fn engages_fallback(self) -> bool { !matches!(self, Self::InScope) }
}
