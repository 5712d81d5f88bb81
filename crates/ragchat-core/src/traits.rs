use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Context, Document, Metadata, ScoredPassage, Vector};

/// Turns text into a fixed-length vector.
///
/// Implementations are deterministic for a fixed model version and reject
/// empty input or input longer than `max_input_chars` with `Error::Embedding`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the backend and model (e.g. `hashing:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_input_chars(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vector>;
}

/// Stores one vector per document and answers nearest-neighbour queries.
///
/// Each `upsert`/`delete` call is atomic: concurrent searches observe the
/// document either before or after the call, never in between.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;
    async fn upsert(&self, document: Document, vector: Vector) -> Result<()>;
    /// Up to `top_k` passages, best first, ties broken by ascending id.
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredPassage>>;
    async fn delete(&self, id: &str) -> Result<()>;
    /// Remove every document whose metadata matches `filters` and return the
    /// count. An empty filter removes nothing.
    async fn delete_where(&self, filters: &Metadata) -> Result<usize>;
    async fn len(&self) -> Result<usize>;
}

/// The text-generation backend: prompt in, completion out.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Called by the pipeline with the rendered prompt and the context it was
    /// built from. Model backends only need the prompt.
    async fn generate_grounded(&self, prompt: &str, _context: &Context) -> Result<String> {
        self.generate(prompt).await
    }
}
