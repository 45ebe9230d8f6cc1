//! Grounding context and prompt text handed to generation backends.

use travelkb_core::types::RetrievalResult;

pub const SYSTEM_PROMPT: &str = "Bạn là trợ lý du lịch về các tỉnh thành Việt Nam. \
Chỉ trả lời dựa trên thông tin trong phần ngữ cảnh được cung cấp, không bịa thêm. \
Trả lời ngắn gọn bằng tiếng Việt. \
Nếu ngữ cảnh không có câu trả lời, hãy nói rõ là bạn chưa có thông tin đó.";

/// Numbered `[i] Province – label: text` lines in ranked order, stopping
/// before the entry that would push the total past `max_chars`. The first
/// entry is always kept, cut to `max_chars` if needed.
pub fn build_context(retrieval: &RetrievalResult, max_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for (i, hit) in retrieval.iter().enumerate() {
        let c = &hit.chunk;
        let line = format!("[{}] {} – {}: {}", i + 1, c.province, c.category.label(), c.text);
        let sep = usize::from(!out.is_empty());
        let len = line.chars().count();
        if used + sep + len > max_chars {
            if out.is_empty() { out = line.chars().take(max_chars).collect(); }
            break;
        }
        if sep == 1 { out.push('\n'); }
        out.push_str(&line);
        used += sep + len;
    }
    out
}

pub fn build_prompt(question: &str, context: &str) -> String {
    format!("Ngữ cảnh:\n{context}\n\nCâu hỏi: {question}\n\nTrả lời:")
}
