//! Templated replies rendered straight from a province record, plus the
//! fixed user-facing messages of the fallback path.

use std::fmt::Write as _;

use travelkb_core::text;
use travelkb_core::types::ProvinceRecord;
use travelkb_core::Corpus;

/// Which part of a province record a reply is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Culture,
    Attractions,
    Cuisine,
    Festivals,
    TravelTips,
    Merger,
    Transportation,
    Overview,
}

/// Keyword phrases per topic, in detection priority order.
const KEYWORDS: &[(Topic, &[&str])] = &[
    (Topic::Cuisine, &["ăn", "ẩm thực", "món", "đặc sản", "ngon", "quà"]),
    (Topic::Attractions, &["chơi", "tham quan", "địa điểm", "đi đâu", "cảnh", "đẹp", "điểm đến"]),
    (Topic::Festivals, &["lễ hội", "festival", "hội làng"]),
    (Topic::TravelTips, &["mẹo", "lưu ý", "kinh nghiệm", "thời điểm", "khi nào", "mùa", "thời tiết"]),
    (Topic::Transportation, &["di chuyển", "phương tiện", "xe", "máy bay", "tàu", "sân bay"]),
    (Topic::Merger, &["sáp nhập", "gồm"]),
    (Topic::Culture, &["văn hóa", "văn hoá", "giới thiệu", "con người", "lịch sử"]),
];

impl Topic {
    /// Topic for a classifier intent label; unknown labels get the overview.
    pub fn from_intent(intent: &str) -> Self {
        match intent.trim() {
            "ask_culture" => Self::Culture,
            "ask_attractions" => Self::Attractions,
            "ask_cuisine" => Self::Cuisine,
            "ask_festival" => Self::Festivals,
            "ask_travel_tips" => Self::TravelTips,
            "ask_new_province" => Self::Merger,
            "ask_transportation" => Self::Transportation,
            _ => Self::Overview,
        }
    }

    pub fn detect(message: &str) -> Self { Self::detect_words(&text::words(message)) }

    /// First topic whose keyword phrase occurs in the normalized words.
    pub fn detect_words<S: AsRef<str>>(words: &[S]) -> Self {
        KEYWORDS
            .iter()
            .find(|(_, phrases)| phrases.iter().any(|p| text::contains_phrase(words, p)))
            .map_or(Self::Overview, |(topic, _)| *topic)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Culture => "culture",
            Self::Attractions => "attractions",
            Self::Cuisine => "cuisine",
            Self::Festivals => "festivals",
            Self::TravelTips => "travel_tips",
            Self::Merger => "merger",
            Self::Transportation => "transportation",
            Self::Overview => "overview",
        }
    }
}

const MAX_ATTRACTIONS: usize = 6;

pub fn render(topic: Topic, record: &ProvinceRecord) -> String {
    let name = &record.name;
    let mut out = String::new();
    // Writing into a String cannot fail.
    match topic {
        Topic::Culture => {
            let _ = write!(out, "📍 **{name}**\n\n{}\n\n", record.culture);
            if !record.sub_regions.is_empty() {
                out.push_str("**Các khu vực đặc trưng:**\n");
                for r in &record.sub_regions {
                    let _ = writeln!(out, "• {}: {}", r.name, r.highlights);
                }
            }
        }
        Topic::Attractions => {
            let _ = write!(out, "📍 **Địa điểm tham quan tại {name}**\n\n");
            if record.attractions.is_empty() {
                out.push_str("Không có thông tin địa điểm tham quan.");
            }
            for (i, a) in record.attractions.iter().take(MAX_ATTRACTIONS).enumerate() {
                let category = a.category.as_deref().filter(|c| !c.trim().is_empty()).unwrap_or("du lịch");
                let _ = write!(out, "{}. **{}** ({category})\n   {}\n\n", i + 1, a.name, a.details);
            }
        }
        Topic::Cuisine => {
            let _ = write!(out, "🍜 **Ẩm thực {name}**\n\n");
            if record.foods.is_empty() {
                out.push_str("Không có thông tin ẩm thực.");
            }
            for (i, f) in record.foods.iter().enumerate() {
                let _ = write!(out, "{}. **{}**\n   {}\n\n", i + 1, f.name, f.details);
            }
            if !record.gifts.is_empty() {
                out.push_str("\n**Đặc sản mua về:**\n");
                for g in &record.gifts {
                    let _ = writeln!(out, "• {g}");
                }
            }
        }
        Topic::Festivals => {
            let _ = write!(out, "🎊 **Lễ hội tại {name}**\n\n");
            if record.festivals.is_empty() {
                out.push_str("Không có thông tin lễ hội.");
            }
            for f in &record.festivals {
                let _ = writeln!(out, "**{}**", f.name);
                if let Some(t) = f.time.as_deref().filter(|t| !t.trim().is_empty()) {
                    let _ = writeln!(out, "⏰ Thời gian: {t}");
                }
                let _ = write!(out, "{}\n\n", f.details);
            }
        }
        Topic::TravelTips => {
            let _ = write!(out, "💡 **Mẹo du lịch {name}**\n\n");
            if let Some(t) = &record.best_time {
                let _ = write!(out, "**Thời điểm đẹp nhất:**\n{t}\n\n");
            }
            if let Some(t) = &record.travel_tips {
                let _ = writeln!(out, "**Lưu ý:**\n{t}");
            }
            if record.best_time.is_none() && record.travel_tips.is_none() {
                out.push_str("Không có thông tin mẹo du lịch.");
            }
        }
        Topic::Merger => {
            let _ = write!(out, "📋 **Cấu trúc tỉnh {name} sau sáp nhập**\n\n");
            if record.sub_regions.is_empty() {
                out.push_str("Không có thông tin sáp nhập.");
            } else {
                let _ = writeln!(out, "{name} bao gồm:");
                for r in &record.sub_regions {
                    let _ = writeln!(out, "• {}", r.name);
                }
                let _ = write!(out, "\n{}", record.culture);
            }
        }
        Topic::Transportation => {
            let _ = write!(out, "🚗 **Phương tiện di chuyển đến {name}**\n\n");
            out.push_str(record.transportation.as_deref().unwrap_or("Không có thông tin phương tiện di chuyển."));
        }
        Topic::Overview => {
            let _ = write!(out, "📍 **{name}**\n\n{}\n\n", record.culture);
            if let Some(t) = &record.best_time {
                let _ = write!(out, "**Thời điểm đẹp:** {t}");
            }
        }
    }
    out.trim_end().to_string()
}

/// Reply to a message too short to search on.
pub const ASK_MORE_DETAIL: &str = "Bạn có thể nói rõ hơn không? \
Ví dụ: 'Giới thiệu về Bắc Ninh' hoặc 'Đà Nẵng có địa điểm nào đẹp?'";

/// Reply when retrieval found nothing confident enough to answer from.
pub const NO_CONFIDENT_DATA: &str = "Xin lỗi, tôi chưa có thông tin đủ tin cậy để trả lời câu này. \
Bạn có thể hỏi tôi về:\n\n\
• Văn hóa các tỉnh thành\n\
• Địa điểm du lịch\n\
• Ẩm thực đặc sản\n\
• Lễ hội truyền thống\n\
• Phương tiện di chuyển\n\
• Mẹo du lịch\n\
• Thông tin về các tỉnh sau sáp nhập\n\n\
Ví dụ: 'Giới thiệu về Bắc Ninh' hoặc 'Đà Nẵng có địa điểm nào đẹp?'";

pub const SYNTHESIS_FAILED: &str = "Xin lỗi, đã có lỗi khi tổng hợp câu trả lời. \
Bạn hãy thử lại sau, hoặc hỏi cụ thể hơn về một tỉnh thành, ví dụ: 'Ẩm thực Huế'.";

pub const ASK_WHICH_PROVINCE: &str = "Bạn muốn biết thông tin về tỉnh/thành phố nào? \
Ví dụ: Bắc Ninh, An Giang, Hà Nội...";

pub fn unknown_province(name: &str, corpus: &Corpus) -> String {
    let examples: Vec<&str> = corpus.names().take(5).collect();
    format!(
        "Xin lỗi, tôi chưa có thông tin về '{name}'. Hiện tôi có dữ liệu về {} tỉnh thành. Bạn có thể hỏi về: {}...",
        corpus.len(),
        examples.join(", ")
    )
}
