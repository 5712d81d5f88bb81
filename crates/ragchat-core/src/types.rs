//! Domain types shared by the embedder, index and pipeline crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type DocumentId = String;
pub type Vector = Vec<f32>;
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A scalar metadata value attached to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl MetadataValue {
    /// Parse a command-line style value: `true`/`false`, integers, floats,
    /// anything else as a string.
    pub fn parse(raw: &str) -> Self {
        if let Ok(b) = raw.parse::<bool>() {
            return MetadataValue::Bool(b);
        }
        if let Ok(i) = raw.parse::<i64>() {
            return MetadataValue::Integer(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return MetadataValue::Float(f);
            }
        }
        MetadataValue::String(raw.to_string())
    }

    /// Filter equality: values of the same kind compare directly, otherwise by
    /// their text form, so `Integer(2020)` matches a stored `"2020"`.
    pub fn loosely_eq(&self, other: &MetadataValue) -> bool {
        match (self, other) {
            (MetadataValue::Integer(a), MetadataValue::Float(b)) | (MetadataValue::Float(b), MetadataValue::Integer(a)) => {
                (*a as f64) == *b
            }
            _ if std::mem::discriminant(self) == std::mem::discriminant(other) => self == other,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(x) => write!(f, "{x}"),
            MetadataValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Integer(i)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// A unit of retrievable text.
///
/// - `id`: opaque, unique within an index
/// - `text`: the passage that is embedded and handed to the generator
/// - `metadata`: scalar attributes used by query filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: Metadata::new() }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// True when every filter entry is present in the metadata with a
    /// [loosely equal](MetadataValue::loosely_eq) value.
    pub fn matches(&self, filters: &Metadata) -> bool {
        filters
            .iter()
            .all(|(key, expected)| self.metadata.get(key).is_some_and(|v| v.loosely_eq(expected)))
    }
}

/// One search result. `score` is finite and higher is better; `rank` is the
/// 1-based position in the result list it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub document: Document,
    pub score: f32,
    pub rank: usize,
}

/// How the context assembler measures passage size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizePolicy {
    #[default]
    Chars,
    Tokens,
}

impl SizePolicy {
    pub fn measure(self, text: &str) -> usize {
        match self {
            SizePolicy::Chars => text.chars().count(),
            SizePolicy::Tokens => approx_tokens(text),
        }
    }
}

/// Rough token estimate: roughly 0.75 words per token.
pub fn approx_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f32 / 0.75) as usize
}

/// Passages selected for one query, in relevance order, within `budget`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub passages: Vec<ScoredPassage>,
    pub size: usize,
    pub budget: usize,
    pub policy: SizePolicy,
}

impl Context {
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn document_ids(&self) -> Vec<DocumentId> {
        self.passages.iter().map(|p| p.document.id.clone()).collect()
    }
}

/// A caller-supplied question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    pub top_k: usize,
    #[serde(default)]
    pub filters: Option<Metadata>,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>, top_k: usize) -> Self {
        Self { text: text.into(), top_k, filters: None }
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.filters.get_or_insert_with(Metadata::new).insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<DocumentId>,
}
