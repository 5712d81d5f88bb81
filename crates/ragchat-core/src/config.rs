//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys come from env vars with `__` as separator, e.g.
//! `APP_GENERATION__GENERATION_TIMEOUT_MS=5000`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::Error;
use crate::types::SizePolicy;

pub const DEFAULT_PROMPT_TEMPLATE: &str = "You are a helpful assistant. Answer the question using only the context below. \
If the context does not contain the answer, say that you don't know.\n\n\
Context:\n{context}\n\nQuestion: {question}\nAnswer:";

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            other => tracing::warn!(env = other, "unknown RUST_ENV, using config.toml only"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the full typed settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub retrieval: RetrievalSettings,
    pub context: ContextSettings,
    pub generation: GenerationSettings,
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// `hashing`, `http` or `bge`.
    pub backend: String,
    pub dim: usize,
    pub max_input_chars: usize,
    pub timeout_ms: u64,
    pub endpoint: String,
    pub model: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: "hashing".to_string(),
            dim: 384,
            max_input_chars: 8192,
            timeout_ms: 10_000,
            endpoint: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Dot,
    Euclidean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// `memory` or `lancedb`.
    pub backend: String,
    pub similarity_metric: SimilarityMetric,
    /// Snapshot file for the memory index, database directory for LanceDB.
    pub path: String,
    pub table: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            similarity_metric: SimilarityMetric::Cosine,
            path: "data/index.json".to_string(),
            table: "documents".to_string(),
        }
    }
}

impl IndexSettings {
    pub fn resolved_path(&self) -> PathBuf {
        expand_path(&self.path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    pub budget: usize,
    pub size_policy: SizePolicy,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self { budget: 2000, size_policy: SizePolicy::Chars }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// `extractive` or `openai`.
    pub backend: String,
    pub endpoint: String,
    pub model: String,
    /// Must contain both `{context}` and `{question}`.
    pub prompt_template: String,
    pub generation_timeout_ms: u64,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            backend: "extractive".to_string(),
            endpoint: "http://localhost:1234".to_string(),
            model: "deepseek-r1".to_string(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            generation_timeout_ms: 30_000,
            max_tokens: Some(512),
            temperature: Some(0.2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self { chunk_size: 800, chunk_overlap: 100 }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be > 0".into()));
        }
        if self.embedding.max_input_chars == 0 {
            return Err(Error::InvalidConfig("embedding.max_input_chars must be > 0".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be >= 1".into()));
        }
        if self.context.budget == 0 {
            return Err(Error::InvalidConfig("context.budget must be > 0".into()));
        }
        for placeholder in ["{context}", "{question}"] {
            if !self.generation.prompt_template.contains(placeholder) {
                return Err(Error::InvalidConfig(format!("generation.prompt_template must contain {placeholder}")));
            }
        }
        if self.ingest.chunk_size == 0 || self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(Error::InvalidConfig("ingest.chunk_overlap must be smaller than a non-zero chunk_size".into()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
