//! Writes loaded chunks into an index, replacing what a source held before.

use ragchat_core::error::Result;
use ragchat_core::traits::{Embedder, VectorIndex};
use ragchat_core::types::{Document, Metadata, MetadataValue};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub indexed: usize,
    pub skipped: usize,
    /// Chunks removed from earlier ingests of the same sources.
    pub replaced: usize,
}

/// Embed and upsert `documents`. Every chunk previously stored under one of
/// their `source` values is deleted first, so a file that shrank leaves no
/// orphaned higher-index chunks behind. Chunks that fail to embed are skipped.
pub async fn index_documents(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    documents: Vec<Document>,
    mut on_progress: impl FnMut(),
) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    let mut sources: Vec<&MetadataValue> = Vec::new();
    for source in documents.iter().filter_map(|d| d.metadata.get("source")) {
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    for source in sources {
        let mut filter = Metadata::new();
        filter.insert("source".into(), source.clone());
        report.replaced += index.delete_where(&filter).await?;
    }
    if report.replaced > 0 {
        tracing::debug!(replaced = report.replaced, "removed previous chunks");
    }

    for doc in documents {
        match embedder.embed(&doc.text).await {
            Ok(vector) => {
                index.upsert(doc, vector).await?;
                report.indexed += 1;
            }
            Err(e) => {
                tracing::warn!(id = %doc.id, error = %e, "skipping chunk");
                report.skipped += 1;
            }
        }
        on_progress();
    }
    Ok(report)
}
