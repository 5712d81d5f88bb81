use std::sync::Arc;
use std::time::{Duration, Instant};

use ragchat_core::config::Settings;
use ragchat_core::error::{Error, Result};
use ragchat_core::traits::{Embedder, Generator, VectorIndex};
use ragchat_core::types::{Answer, Context, QueryRequest, SizePolicy};

use crate::context::ContextAssembler;
use crate::events::{EventSink, Stage, StageEvent, TracingSink};
use crate::prompt::PromptBuilder;
use crate::retriever::Retriever;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub context_budget: usize,
    pub size_policy: SizePolicy,
    pub prompt_template: String,
    pub embedding_timeout: Duration,
    pub generation_timeout: Duration,
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            context_budget: settings.context.budget,
            size_policy: settings.context.size_policy,
            prompt_template: settings.generation.prompt_template.clone(),
            embedding_timeout: Duration::from_millis(settings.embedding.timeout_ms),
            generation_timeout: Duration::from_millis(settings.generation.generation_timeout_ms),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Query-to-answer coordinator.
///
/// Runs retrieval, context assembly and generation in sequence. Retrieval
/// errors are returned as-is rather than answered without context; a failed or
/// timed-out generation is a `Generation` error and is not retried.
pub struct Pipeline {
    retriever: Retriever,
    assembler: ContextAssembler,
    prompt: PromptBuilder,
    generator: Arc<dyn Generator>,
    sink: Arc<dyn EventSink>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn Generator>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            retriever: Retriever::new(embedder, index, options.embedding_timeout),
            assembler: ContextAssembler::new(options.size_policy),
            prompt: PromptBuilder::new(options.prompt_template.clone()),
            generator,
            sink: Arc::new(TracingSink),
            options,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Retrieval and assembly only, for inspecting what the generator would see.
    pub async fn retrieve_context(&self, query: &QueryRequest) -> Result<Context> {
        let started = Instant::now();
        let retrieved = self.retriever.retrieve(query).await;
        self.record(Stage::Retrieval, started, &retrieved, |p| p.len());
        let passages = retrieved?;

        let started = Instant::now();
        let context = self.assembler.assemble(&passages, self.options.context_budget);
        self.sink.emit(&StageEvent {
            stage: Stage::Assembly,
            latency_ms: elapsed_ms(started),
            status: "ok".to_string(),
            items: context.passages.len(),
        });
        tracing::debug!(size = context.size, budget = context.budget, passages = context.passages.len(), "context assembled");
        Ok(context)
    }

    pub async fn answer(&self, query: &QueryRequest) -> Result<Answer> {
        let context = self.retrieve_context(query).await?;
        let prompt = self.prompt.build(&query.text, &context);

        let started = Instant::now();
        let call = self.generator.generate_grounded(&prompt, &context);
        let generated = match tokio::time::timeout(self.options.generation_timeout, call).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(Error::Generation(msg))) => Err(Error::Generation(msg)),
            Ok(Err(other)) => Err(Error::Generation(format!("{} backend failed: {other}", self.generator.name()))),
            Err(_) => Err(Error::Generation(format!(
                "{} backend timed out after {} ms",
                self.generator.name(),
                self.options.generation_timeout.as_millis()
            ))),
        };
        self.record(Stage::Generation, started, &generated, String::len);
        let text = generated?;

        Ok(Answer { text, sources: context.document_ids() })
    }

    fn record<T>(&self, stage: Stage, started: Instant, outcome: &Result<T>, items: impl Fn(&T) -> usize) {
        let (status, items) = match outcome {
            Ok(v) => ("ok".to_string(), items(v)),
            Err(e) => (e.kind().to_string(), 0),
        };
        self.sink.emit(&StageEvent { stage, latency_ms: elapsed_ms(started), status, items });
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
