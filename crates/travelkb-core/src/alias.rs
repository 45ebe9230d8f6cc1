//! Location alias resolver.
//!
//! Maps historical names, abbreviations and unaccented spellings to one
//! canonical province name. The table is a function: a normalized alias maps
//! to exactly one canonical name, and every canonical name maps to itself.
//!
//! On disk the table is an ordered JSON array of groups:
//!
//! ```json
//! [{"canonical": "Hồ Chí Minh", "aliases": ["Sài Gòn", "HCM", "Bình Dương"]}]
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::text::{find_phrase, normalize, words};

const BUILTIN_ALIASES: &str = include_str!("../../../data/aliases.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasGroup {
    pub canonical: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// One alias and the canonical name it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub alias: String,
    pub canonical: String,
}

/// An alias claimed by two canonical names; `kept` is the later one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasConflict {
    pub alias: String,
    pub dropped: String,
    pub kept: String,
}

/// A location found inside free text. `start`/`len` are word offsets in the
/// normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasMatch {
    pub alias: String,
    pub canonical: String,
    pub start: usize,
    pub len: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    surface: String,
    key: String,
    words: Vec<String>,
    canonical: String,
}

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<Entry>,
    by_key: HashMap<String, usize>,
    canonicals: Vec<String>,
    conflicts: Vec<AliasConflict>,
}

impl AliasTable {
    /// The table shipped with the crate (`data/aliases.json`).
    pub fn builtin() -> Result<Self> { Self::from_json("builtin aliases", BUILTIN_ALIASES) }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|source| Error::Io { path: path.display().to_string(), source })?;
        Self::from_json(&path.display().to_string(), &contents)
    }

    pub fn from_json(label: &str, contents: &str) -> Result<Self> {
        let groups: Vec<AliasGroup> = serde_json::from_str(contents)
            .map_err(|source| Error::Json { label: label.to_string(), source })?;
        let table = Self::from_groups(groups);
        debug!(source = label, aliases = table.len(), provinces = table.canonicals.len(), "alias table loaded");
        Ok(table)
    }

    pub fn from_groups<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = AliasGroup>,
    {
        let mut table = Self::default();
        for group in groups {
            let canonical = group.canonical.trim().to_string();
            if canonical.is_empty() { continue; }
            if !table.canonicals.contains(&canonical) { table.canonicals.push(canonical.clone()); }
            table.insert(&canonical, &canonical);
            for alias in &group.aliases { table.insert(alias, &canonical); }
        }
        table
    }

    fn insert(&mut self, surface: &str, canonical: &str) {
        let key = normalize(surface);
        if key.is_empty() { return; }
        if let Some(&idx) = self.by_key.get(&key) {
            let entry = &mut self.entries[idx];
            if entry.canonical != canonical {
                warn!(alias = surface, previous = %entry.canonical, canonical, "alias claimed by two provinces, keeping the later one");
                self.conflicts.push(AliasConflict {
                    alias: surface.to_string(),
                    dropped: std::mem::replace(&mut entry.canonical, canonical.to_string()),
                    kept: canonical.to_string(),
                });
            }
            return;
        }
        self.by_key.insert(key.clone(), self.entries.len());
        self.entries.push(Entry {
            surface: surface.trim().to_string(),
            words: key.split(' ').map(str::to_string).collect(),
            key,
            canonical: canonical.to_string(),
        });
    }

    /// Exact, case-insensitive lookup of an isolated location string.
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.by_key.get(&normalize(raw)).map(|&i| self.entries[i].canonical.as_str())
    }

    /// Canonical name for `raw`, or `raw` unchanged when it is not an alias.
    pub fn resolve(&self, raw: &str) -> String {
        self.lookup(raw).map_or_else(|| raw.to_string(), str::to_string)
    }

    /// Scan free text for the longest alias occurring as whole words. Ties on
    /// length go to the earlier position in the text.
    pub fn find_in(&self, text: &str) -> Option<AliasMatch> {
        let haystack = words(text);
        if haystack.is_empty() { return None; }
        let mut best: Option<(usize, usize, &Entry)> = None;
        for entry in &self.entries {
            let Some(start) = find_phrase(&haystack, &entry.words) else { continue };
            let len = entry.key.chars().count();
            let better = match best {
                None => true,
                Some((best_len, best_start, _)) => len > best_len || (len == best_len && start < best_start),
            };
            if better { best = Some((len, start, entry)); }
        }
        best.map(|(_, start, entry)| AliasMatch {
            alias: entry.surface.clone(),
            canonical: entry.canonical.clone(),
            start,
            len: entry.words.len(),
        })
    }

    /// Replace the best alias match in `text` with its canonical name.
    /// Returns the normalized text with the substitution, or `text` unchanged
    /// when no alias occurs.
    pub fn rewrite(&self, text: &str) -> String {
        let Some(m) = self.find_in(text) else { return text.to_string() };
        let ws = words(text);
        let mut out: Vec<&str> = ws[..m.start].iter().map(String::as_str).collect();
        out.push(&m.canonical);
        out.extend(ws[m.start + m.len..].iter().map(String::as_str));
        out.join(" ")
    }

    /// Canonical names in table order.
    pub fn canonicals(&self) -> &[String] { &self.canonicals }

    pub fn entries(&self) -> impl Iterator<Item = AliasEntry> + '_ {
        self.entries.iter().map(|e| AliasEntry { alias: e.surface.clone(), canonical: e.canonical.clone() })
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn conflicts(&self) -> &[AliasConflict] { &self.conflicts }

    /// Aliases whose canonical target has no record in `corpus`.
    pub fn dangling(&self, corpus: &Corpus) -> Vec<AliasEntry> {
        self.entries().filter(|e| !corpus.contains(&e.canonical)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(canonical: &str, aliases: &[&str]) -> AliasGroup {
        AliasGroup { canonical: canonical.into(), aliases: aliases.iter().map(|s| s.to_string()).collect() }
    }

    fn table() -> AliasTable {
        AliasTable::from_groups(vec![
            group("Huế", &["Hue", "Thừa Thiên Huế"]),
            group("Hồ Chí Minh", &["Sài Gòn", "HCM", "Bình Dương"]),
            group("Đà Nẵng", &["Da Nang", "Hội An"]),
        ])
    }

    #[test]
    fn resolve_is_case_and_space_insensitive() {
        let t = table();
        assert_eq!(t.resolve("  sài GÒN "), "Hồ Chí Minh");
        assert_eq!(t.resolve("hcm"), "Hồ Chí Minh");
        assert_eq!(t.resolve("Hồ Chí Minh"), "Hồ Chí Minh");
    }

    #[test]
    fn unknown_and_empty_inputs_are_returned_unchanged() {
        let t = table();
        assert_eq!(t.resolve("Atlantis"), "Atlantis");
        assert_eq!(t.resolve(""), "");
        assert_eq!(t.resolve("  "), "  ");
        assert_eq!(t.lookup("Atlantis"), None);
    }

    #[test]
    fn longest_alias_wins_in_free_text() {
        let t = AliasTable::from_groups(vec![group("Huế", &["Huế"]), group("Thừa Thiên", &["Thừa Thiên Huế"])]);
        let m = t.find_in("du lịch Thừa Thiên Huế mùa nào đẹp").unwrap();
        assert_eq!(m.canonical, "Thừa Thiên");
        assert_eq!((m.start, m.len), (2, 3));
    }

    #[test]
    fn equal_length_ties_go_to_earlier_mention() {
        let t = table();
        let m = t.find_in("đi hue rồi vào hcm").unwrap();
        assert_eq!(m.alias, "Hue");
        // longer alias still beats an earlier, shorter one
        let m = t.find_in("từ Hội An ra Da Nang").unwrap();
        assert_eq!(m.canonical, "Đà Nẵng");
        assert_eq!(m.alias, "Da Nang");
    }

    #[test]
    fn scanning_requires_whole_words() {
        let t = table();
        assert!(t.find_in("chữ hue trong huesca").map(|m| m.start) == Some(1));
        assert!(t.find_in("huesca").is_none());
        assert!(t.find_in("").is_none());
    }

    #[test]
    fn rewrite_substitutes_canonical_name() {
        let t = table();
        assert_eq!(t.rewrite("Bình Dương có gì chơi?"), "Hồ Chí Minh có gì chơi");
        assert_eq!(t.rewrite("không có địa danh"), "không có địa danh");
    }

    #[test]
    fn conflicting_alias_keeps_later_mapping() {
        let t = AliasTable::from_groups(vec![group("A", &["X"]), group("B", &["x"])]);
        assert_eq!(t.resolve("X"), "B");
        assert_eq!(t.conflicts().len(), 1);
        assert_eq!(t.conflicts()[0].dropped, "A");
        assert_eq!(t.conflicts()[0].kept, "B");
    }

    #[test]
    fn dangling_reports_missing_targets() {
        let corpus = Corpus::from_units(vec![crate::corpus::SourceUnit::new(
            "hue.json",
            r#"{"Huế": {"culture_details": "Cố đô."}}"#,
        )]).unwrap();
        let dangling = table().dangling(&corpus);
        assert!(dangling.iter().all(|e| e.canonical != "Huế"));
        assert!(dangling.iter().any(|e| e.alias == "Sài Gòn"));
    }
}
