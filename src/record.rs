use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::SeoError;

/// Output language of a generated record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "cn")]
    Chinese,
    #[serde(rename = "en")]
    English,
}

impl Language {
    /// Short tag used in artifact file names
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Chinese => "cn",
            Self::English => "en",
        }
    }

    /// Full language name for prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Chinese => "Chinese",
            Self::English => "English",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = SeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cn" | "zh" | "chinese" => Ok(Self::Chinese),
            "en" | "english" => Ok(Self::English),
            other => Err(SeoError::Configuration(format!(
                "Unsupported language '{}'. Valid languages: cn, en",
                other
            ))),
        }
    }
}

/// Descriptive metadata generated for one item in one language
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedRecord {
    /// Candidate titles, stored on disk as one newline-separated string
    #[serde(rename = "title", default, with = "title_lines")]
    pub title_variants: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

impl GeneratedRecord {
    /// True when any of the four fields fell back to its empty default
    pub fn is_degraded(&self) -> bool {
        self.title_variants.is_empty()
            || self.description.is_empty()
            || self.keywords.is_empty()
            || self.summary.is_empty()
    }
}

mod title_lines {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTitle {
        Lines(String),
        List(Vec<String>),
    }

    pub fn serialize<S: Serializer>(variants: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&variants.join("\n"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        // Split verbatim so a loaded record re-serializes to the same bytes
        Ok(match RawTitle::deserialize(deserializer)? {
            RawTitle::Lines(s) if s.is_empty() => Vec::new(),
            RawTitle::Lines(s) => s.split('\n').map(str::to_string).collect(),
            RawTitle::List(list) => list,
        })
    }
}

/// Per-language results keyed by item identifier, in processing order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultStore(IndexMap<String, GeneratedRecord>);

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.0.contains_key(identifier)
    }

    pub fn get(&self, identifier: &str) -> Option<&GeneratedRecord> {
        self.0.get(identifier)
    }

    pub fn insert(&mut self, identifier: String, record: GeneratedRecord) {
        self.0.insert(identifier, record);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// One result store per required language
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    stores: IndexMap<Language, ResultStore>,
}

impl ResultSet {
    pub fn new(languages: &[Language]) -> Self {
        Self {
            stores: languages.iter().map(|&lang| (lang, ResultStore::new())).collect(),
        }
    }

    pub fn with_store(mut self, language: Language, store: ResultStore) -> Self {
        self.stores.insert(language, store);
        self
    }

    pub fn store(&self, language: Language) -> Option<&ResultStore> {
        self.stores.get(&language)
    }

    pub(crate) fn store_mut(&mut self, language: Language) -> &mut ResultStore {
        self.stores.entry(language).or_default()
    }

    /// Whether the identifier is present in every given language
    pub fn contains_all(&self, identifier: &str, languages: &[Language]) -> bool {
        languages
            .iter()
            .all(|lang| self.store(*lang).is_some_and(|s| s.contains(identifier)))
    }

    /// Whether any stored record for the identifier is degraded
    pub fn any_degraded(&self, identifier: &str, languages: &[Language]) -> bool {
        languages.iter().any(|lang| {
            self.store(*lang)
                .and_then(|s| s.get(identifier))
                .is_some_and(GeneratedRecord::is_degraded)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (Language, &ResultStore)> {
        self.stores.iter().map(|(lang, store)| (*lang, store))
    }
}
