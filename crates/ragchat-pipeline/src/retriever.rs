use std::sync::Arc;
use std::time::Duration;

use ragchat_core::error::{Error, Result};
use ragchat_core::traits::{Embedder, VectorIndex};
use ragchat_core::types::{QueryRequest, ScoredPassage};

/// Embeds the query, searches the index, then applies metadata filters.
///
/// Filtering happens after the search, so a filtered query may return fewer
/// than `top_k` passages. Ranks are those assigned by the index.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    embed_timeout: Duration,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, embed_timeout: Duration) -> Self {
        Self { embedder, index, embed_timeout }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub async fn retrieve(&self, query: &QueryRequest) -> Result<Vec<ScoredPassage>> {
        if query.top_k < 1 {
            return Err(Error::InvalidQuery("top_k must be at least 1".into()));
        }
        let query_vector = tokio::time::timeout(self.embed_timeout, self.embedder.embed(&query.text))
            .await
            .map_err(|_| Error::Embedding(format!("embedding timed out after {} ms", self.embed_timeout.as_millis())))??;
        let mut passages = self.index.search(&query_vector, query.top_k).await?;
        if let Some(filters) = query.filters.as_ref().filter(|f| !f.is_empty()) {
            let before = passages.len();
            passages.retain(|p| p.document.matches(filters));
            tracing::debug!(before, after = passages.len(), "applied metadata filters");
        }
        Ok(passages)
    }
}
