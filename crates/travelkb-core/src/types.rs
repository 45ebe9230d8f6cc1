//! Domain types: province records as stored on disk, the retrievable chunks
//! derived from them, and per-query retrieval results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One administrative province, keyed by its canonical (post-merger) name.
///
/// Field names on disk follow the knowledge-base JSON files
/// (`culture_details`, `places_to_visit`, `what_to_eat`, ...). Every field
/// except `culture` may be missing. `name` is not part of the record body: it
/// is the key the record is stored under and is filled in by the loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvinceRecord {
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "culture_details")]
    pub culture: String,
    #[serde(default)]
    pub sub_regions: Vec<SubRegion>,
    #[serde(default, rename = "places_to_visit")]
    pub attractions: Vec<Attraction>,
    #[serde(default, rename = "what_to_eat")]
    pub foods: Vec<Food>,
    #[serde(default, rename = "specialties_as_gifts")]
    pub gifts: Vec<String>,
    #[serde(default)]
    pub festivals: Vec<Festival>,
    #[serde(default, rename = "best_time_to_visit")]
    pub best_time: Option<String>,
    #[serde(default)]
    pub travel_tips: Option<String>,
    #[serde(default)]
    pub transportation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubRegion {
    pub name: String,
    #[serde(default)]
    pub highlights: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attraction {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Festival {
    pub name: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub details: String,
}

/// Which record field a chunk came from. `tag()` matches the JSON key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Culture,
    SubRegion,
    Attraction,
    Food,
    Gift,
    Festival,
    BestTime,
    TravelTips,
    Transportation,
}

impl FieldCategory {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Culture => "culture_details",
            Self::SubRegion => "sub_regions",
            Self::Attraction => "places_to_visit",
            Self::Food => "what_to_eat",
            Self::Gift => "specialties_as_gifts",
            Self::Festival => "festivals",
            Self::BestTime => "best_time_to_visit",
            Self::TravelTips => "travel_tips",
            Self::Transportation => "transportation",
        }
    }

    /// Vietnamese label used in prompts and embedding text.
    pub fn label(self) -> &'static str {
        match self {
            Self::Culture => "văn hóa",
            Self::SubRegion => "khu vực",
            Self::Attraction => "địa điểm tham quan",
            Self::Food => "ẩm thực món ăn",
            Self::Gift => "đặc sản làm quà",
            Self::Festival => "lễ hội",
            Self::BestTime => "thời điểm du lịch",
            Self::TravelTips => "mẹo du lịch",
            Self::Transportation => "phương tiện di chuyển",
        }
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.tag()) }
}

/// A retrievable unit of text taken from exactly one province field.
///
/// - `id`: `"<province>/<tag>#<n>"`, unique within a corpus
/// - `title`: item name for list fields (attraction, dish, festival), empty otherwise
/// - `text`: the raw source text, returned verbatim by the extractive fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub province: String,
    pub category: FieldCategory,
    pub title: String,
    pub text: String,
}

impl Chunk {
    /// `"<province>/<tag>"`, e.g. `Đà Nẵng/what_to_eat`.
    pub fn tag(&self) -> String { format!("{}/{}", self.province, self.category.tag()) }

    /// Text handed to the encoder. Province name and field label are included
    /// so that queries naming either land on the right chunk.
    pub fn embedding_text(&self) -> String {
        if self.title.is_empty() {
            format!("{} {}: {}", self.province, self.category.label(), self.text)
        } else {
            format!("{} {} {}: {}", self.province, self.category.label(), self.title, self.text)
        }
    }

    /// Chunk text prefixed with its source province.
    pub fn attributed(&self) -> String { format!("{}: {}", self.province, self.text) }
}

impl ProvinceRecord {
    /// Flatten into chunks, one per logical unit, in field order. Blank
    /// fields produce no chunk.
    pub fn to_chunks(&self) -> Vec<Chunk> {
        let mut out = Vec::new();
        let mut push = |category: FieldCategory, title: &str, text: String| {
            let text = text.trim().to_string();
            if text.is_empty() { return; }
            let n = out.iter().filter(|c: &&Chunk| c.category == category).count();
            out.push(Chunk {
                id: format!("{}/{}#{}", self.name, category.tag(), n),
                province: self.name.clone(),
                category,
                title: title.to_string(),
                text,
            });
        };

        push(FieldCategory::Culture, "", self.culture.clone());
        for r in &self.sub_regions {
            push(FieldCategory::SubRegion, &r.name, join_nonempty(&[&r.name, &r.highlights], ": "));
        }
        for a in &self.attractions {
            let head = match &a.category { Some(c) if !c.trim().is_empty() => format!("{} ({})", a.name, c), _ => a.name.clone() };
            push(FieldCategory::Attraction, &a.name, join_nonempty(&[&head, &a.details], ": "));
        }
        for f in &self.foods {
            push(FieldCategory::Food, &f.name, join_nonempty(&[&f.name, &f.details], ": "));
        }
        if !self.gifts.is_empty() {
            push(FieldCategory::Gift, "", self.gifts.join(", "));
        }
        for f in &self.festivals {
            let head = match &f.time { Some(t) if !t.trim().is_empty() => format!("{} ({})", f.name, t), _ => f.name.clone() };
            push(FieldCategory::Festival, &f.name, join_nonempty(&[&head, &f.details], ": "));
        }
        if let Some(t) = &self.best_time { push(FieldCategory::BestTime, "", t.clone()); }
        if let Some(t) = &self.travel_tips { push(FieldCategory::TravelTips, "", t.clone()); }
        if let Some(t) = &self.transportation { push(FieldCategory::Transportation, "", t.clone()); }
        out
    }
}

fn join_nonempty(parts: &[&str], sep: &str) -> String {
    parts.iter().map(|p| p.trim()).filter(|p| !p.is_empty()).collect::<Vec<_>>().join(sep)
}

/// A chunk with its similarity to the query. Higher is better.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub score: f32,
    pub chunk: Chunk,
}

/// Ranked retrieval output, highest score first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn new(hits: Vec<ScoredChunk>) -> Self { Self { hits } }
    pub fn empty() -> Self { Self::default() }
    pub fn top(&self) -> Option<&ScoredChunk> { self.hits.first() }
    pub fn top_score(&self) -> Option<f32> { self.top().map(|h| h.score) }
    pub fn is_empty(&self) -> bool { self.hits.is_empty() }
    pub fn len(&self) -> usize { self.hits.len() }
    pub fn iter(&self) -> std::slice::Iter<'_, ScoredChunk> { self.hits.iter() }
}
