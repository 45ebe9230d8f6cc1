//! Text normalization shared by alias matching, keyword heuristics and the
//! hashing encoder.
//!
//! Normal form: Unicode NFC, lowercase, every non-alphanumeric character
//! replaced by a space, whitespace collapsed to single spaces. Vietnamese
//! diacritics survive (they are alphabetic after composition), so "Huế" and
//! "Hue" stay distinct keys.

use unicode_normalization::UnicodeNormalization;

pub fn normalize(input: &str) -> String {
    let mapped: String = input
        .nfc()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Words of the normalized form.
pub fn words(input: &str) -> Vec<String> {
    normalize(input).split(' ').filter(|w| !w.is_empty()).map(str::to_string).collect()
}

pub fn word_count(input: &str) -> usize { words(input).len() }

/// Position of the first occurrence of `needle` as a contiguous run of whole
/// words inside `haystack`.
pub fn find_phrase<S: AsRef<str>, T: AsRef<str>>(haystack: &[S], needle: &[T]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() { return None; }
    haystack
        .windows(needle.len())
        .position(|w| w.iter().zip(needle).all(|(a, b)| a.as_ref() == b.as_ref()))
}

/// True when `phrase` (any form) occurs as whole words in already-split `words`.
pub fn contains_phrase<S: AsRef<str>>(words: &[S], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split_whitespace().collect();
    find_phrase(words, &needle).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("  TP.HCM, Sài   Gòn!! "), "tp hcm sài gòn");
        assert_eq!(normalize("Bà Rịa - Vũng Tàu"), "bà rịa vũng tàu");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_composes_decomposed_input() {
        // "Huế" written with a combining circumflex and acute
        let decomposed = "Hue\u{302}\u{301}";
        assert_eq!(normalize(decomposed), normalize("Huế"));
    }

    #[test]
    fn phrase_matching_is_word_bounded() {
        let hay = words("đi Huế chơi");
        assert_eq!(find_phrase(&hay, &["huế"]), Some(1));
        assert!(contains_phrase(&hay, "đi"));
        assert!(!contains_phrase(&words("Thừa Thiên Huế"), "thiên huế chơi"));
        assert!(find_phrase(&words("hue"), &["h"]).is_none());
    }

    #[test]
    fn word_count_ignores_punctuation() {
        assert_eq!(word_count("ok"), 1);
        assert_eq!(word_count("  ... "), 0);
        assert_eq!(word_count("Ẩm thực Đà Nẵng?"), 4);
    }
}
