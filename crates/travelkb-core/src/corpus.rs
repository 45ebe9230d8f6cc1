//! Knowledge corpus: every province record, loaded once at start and
//! immutable afterwards.
//!
//! A source unit is one JSON object mapping canonical province names to
//! record bodies (normally one file per province). Loading is tolerant: a
//! unit that fails to read or parse is logged and skipped, and only a corpus
//! with zero records is an error. When two units declare the same province,
//! the later unit wins.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::text::normalize;
use crate::types::{Chunk, ProvinceRecord};

/// Raw contents of one source unit plus a label for diagnostics.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub label: String,
    pub contents: String,
}

impl SourceUnit {
    pub fn new(label: impl Into<String>, contents: impl Into<String>) -> Self {
        Self { label: label.into(), contents: contents.into() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: BTreeMap<String, ProvinceRecord>,
    by_key: HashMap<String, String>,
    skipped: Vec<String>,
}

impl Corpus {
    /// Load every `*.json` file under `dir`, in path order.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("corpus directory {}", dir.display())));
        }
        let mut units = Vec::new();
        let mut unreadable = Vec::new();
        for path in list_json_files(dir) {
            let label = path.strip_prefix(dir).unwrap_or(&path).display().to_string();
            match fs::read_to_string(&path) {
                Ok(contents) => units.push(SourceUnit { label, contents }),
                Err(e) => {
                    warn!(unit = %label, error = %e, "skipping unreadable corpus file");
                    unreadable.push(label);
                }
            }
        }
        let mut corpus = Self::from_units(units)?;
        unreadable.append(&mut corpus.skipped);
        corpus.skipped = unreadable;
        Ok(corpus)
    }

    /// Merge units in order. Malformed units are skipped; duplicates overwrite.
    pub fn from_units<I>(units: I) -> Result<Self>
    where
        I: IntoIterator<Item = SourceUnit>,
    {
        let mut corpus = Self::default();
        for unit in units {
            match parse_unit(&unit) {
                Ok(records) => {
                    debug!(unit = %unit.label, provinces = records.len(), "loaded corpus unit");
                    for record in records { corpus.insert(record, &unit.label); }
                }
                Err(e) => {
                    warn!(unit = %unit.label, error = %e, "skipping malformed corpus unit");
                    corpus.skipped.push(unit.label);
                }
            }
        }
        if corpus.records.is_empty() { return Err(Error::EmptyCorpus); }
        info!(provinces = corpus.records.len(), skipped = corpus.skipped.len(), "knowledge corpus loaded");
        Ok(corpus)
    }

    /// Build directly from records (later duplicates win).
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = ProvinceRecord>,
    {
        let mut corpus = Self::default();
        for record in records { corpus.insert(record, "<memory>"); }
        if corpus.records.is_empty() { return Err(Error::EmptyCorpus); }
        Ok(corpus)
    }

    fn insert(&mut self, record: ProvinceRecord, label: &str) {
        let key = normalize(&record.name);
        if let Some(previous) = self.by_key.get(&key).cloned() {
            warn!(province = %record.name, unit = %label, "duplicate province record, keeping the later one");
            self.records.remove(&previous);
        }
        self.by_key.insert(key, record.name.clone());
        self.records.insert(record.name.clone(), record);
    }

    /// Case-insensitive lookup by canonical name.
    pub fn get(&self, name: &str) -> Option<&ProvinceRecord> {
        self.records
            .get(name)
            .or_else(|| self.by_key.get(&normalize(name)).and_then(|n| self.records.get(n)))
    }

    pub fn contains(&self, name: &str) -> bool { self.get(name).is_some() }
    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
    pub fn names(&self) -> impl Iterator<Item = &str> { self.records.keys().map(String::as_str) }
    pub fn records(&self) -> impl Iterator<Item = &ProvinceRecord> { self.records.values() }

    /// Labels of units that were skipped during load.
    pub fn skipped(&self) -> &[String] { &self.skipped }

    /// All chunks, province by province in name order, fields in record order.
    pub fn chunks(&self) -> Vec<Chunk> { self.records.values().flat_map(ProvinceRecord::to_chunks).collect() }
}

fn parse_unit(unit: &SourceUnit) -> Result<Vec<ProvinceRecord>> {
    let parsed: BTreeMap<String, ProvinceRecord> = serde_json::from_str(&unit.contents)
        .map_err(|source| Error::Json { label: unit.label.clone(), source })?;
    let mut out = Vec::with_capacity(parsed.len());
    for (name, mut record) in parsed {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidRecord { label: unit.label.clone(), province: name, reason: "empty province name".into() });
        }
        if record.culture.trim().is_empty() {
            return Err(Error::InvalidRecord { label: unit.label.clone(), province: name, reason: "missing culture description".into() });
        }
        record.name = name;
        out.push(record);
    }
    Ok(out)
}

fn list_json_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") { files.push(path.to_path_buf()); }
    }
    files.sort();
    files
}
