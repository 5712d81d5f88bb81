//! ragchat-pipeline
//!
//! Retriever, context assembler, prompt rendering, generator backends and the
//! `Pipeline` coordinator that ties them into a query-to-answer call.

use std::sync::Arc;

use anyhow::Result;
use ragchat_core::config::{GenerationSettings, Settings};
use ragchat_core::error::Error;
use ragchat_core::traits::Generator;
use ragchat_embed::embedder_from_settings;
use ragchat_vector::OpenedIndex;

pub mod context;
pub mod coordinator;
pub mod events;
pub mod generator;
pub mod ingest;
pub mod prompt;
pub mod retriever;

pub use context::ContextAssembler;
pub use coordinator::{Pipeline, PipelineOptions};
pub use events::{EventSink, NoopSink, Stage, StageEvent, TracingSink};
pub use generator::{ExtractiveGenerator, OpenAiGenerator};
pub use ingest::{index_documents, IngestReport};
pub use prompt::PromptBuilder;
pub use retriever::Retriever;

pub fn generator_from_settings(settings: &GenerationSettings) -> Result<Arc<dyn Generator>> {
    match settings.backend.as_str() {
        "extractive" => Ok(Arc::new(ExtractiveGenerator)),
        "openai" => Ok(Arc::new(OpenAiGenerator::new(settings))),
        other => Err(Error::InvalidConfig(format!("unknown generation backend '{other}'")).into()),
    }
}

/// Wire embedder, index and generator from settings into a shared pipeline.
///
/// The opened index is returned alongside so callers can ingest into it and
/// persist it.
pub async fn build_pipeline(settings: &Settings) -> Result<(Arc<Pipeline>, OpenedIndex)> {
    let embedder = embedder_from_settings(&settings.embedding)?;
    let index = OpenedIndex::open(&settings.index, embedder.dim()).await?;
    let generator = generator_from_settings(&settings.generation)?;
    tracing::info!(embedder = embedder.id(), generator = generator.name(), "pipeline ready");
    let pipeline = Pipeline::new(embedder, index.handle(), generator, PipelineOptions::from_settings(settings));
    Ok((Arc::new(pipeline), index))
}
