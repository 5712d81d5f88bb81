use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use ragchat_core::config::{Config, Settings};
use ragchat_core::ingest::{ChunkingConfig, DocumentLoader};
use ragchat_core::types::{Answer, QueryRequest};
use ragchat_pipeline::{build_pipeline, index_documents, Pipeline};
use ragchat_vector::OpenedIndex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod args;

use args::{AskArgs, Command, USAGE};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let argv: Vec<String> = env::args().skip(1).collect();
    let command = args::parse(&argv).map_err(|e| {
        eprintln!("{e}\n\n{USAGE}");
        e
    })?;
    if command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;
    let (pipeline, index) = build_pipeline(&settings).await?;

    match command {
        Command::Ingest { dir, limit } => ingest(&settings, &pipeline, &index, &dir, limit).await?,
        Command::Ask(ask) => {
            let query = query_from(&settings, ask.question.clone(), &ask);
            if ask.show_context {
                let context = pipeline.retrieve_context(&query).await?;
                println!("--- context ({} / {} {:?}) ---", context.size, context.budget, context.policy);
                for p in &context.passages {
                    println!("#{} {:.4} {}", p.rank, p.score, p.document.id);
                }
                println!();
            }
            print_answer(&pipeline.answer(&query).await?);
        }
        Command::Chat => chat(&settings, &pipeline).await?,
        Command::Stats => {
            println!("documents:  {}", index.handle().len().await?);
            println!("embedder:   {} (dim {})", pipeline.retriever().embedder().id(), index.handle().dim());
            println!("index:      {} ({:?})", settings.index.backend, settings.index.similarity_metric);
            println!("generation: {} ({})", settings.generation.backend, settings.generation.model);
            println!("budget:     {} {:?}", settings.context.budget, settings.context.size_policy);
        }
        Command::Help => {}
    }
    Ok(())
}

fn query_from(settings: &Settings, text: String, ask: &AskArgs) -> QueryRequest {
    let mut query = QueryRequest::new(text, ask.top_k.unwrap_or(settings.retrieval.top_k));
    if !ask.filters.is_empty() {
        query.filters = Some(ask.filters.clone());
    }
    query
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);
    if !answer.sources.is_empty() {
        println!("\nSources: {}", answer.sources.join(", "));
    }
}

async fn ingest(
    settings: &Settings,
    pipeline: &Arc<Pipeline>,
    index: &OpenedIndex,
    dir: &Path,
    limit: Option<usize>,
) -> Result<()> {
    let loader = DocumentLoader::new(ChunkingConfig::from(&settings.ingest));
    let documents = match limit {
        Some(n) => loader.load_directory_limited(dir, n)?,
        None => loader.load_directory(dir)?,
    };
    tracing::info!(dir = %dir.display(), chunks = documents.len(), "ingesting");

    let embedder = pipeline.retriever().embedder();
    let handle = index.handle();
    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} chunks ({eta})")?);
    let report = index_documents(embedder.as_ref(), handle.as_ref(), documents, || pb.inc(1)).await?;
    pb.finish_and_clear();

    index.persist().await?;
    println!(
        "Indexed {} chunks, skipped {}, replaced {} ({} documents in index)",
        report.indexed,
        report.skipped,
        report.replaced,
        handle.len().await?
    );
    Ok(())
}

async fn chat(settings: &Settings, pipeline: &Arc<Pipeline>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let defaults = AskArgs::default();
    print!("> ");
    io::stdout().flush()?;
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if matches!(question, "exit" | "quit") {
            break;
        }
        if !question.is_empty() {
            match pipeline.answer(&query_from(settings, question.to_string(), &defaults)).await {
                Ok(answer) => print_answer(&answer),
                Err(e) => println!("error: {e}"),
            }
        }
        print!("\n> ");
        io::stdout().flush()?;
    }
    Ok(())
}
