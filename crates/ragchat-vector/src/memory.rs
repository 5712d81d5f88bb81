//! Exact in-process vector index with JSON snapshots.
//!
//! Entries live behind `Arc` in a map guarded by a `tokio::sync::RwLock`.
//! Searches hold the read lock only while scoring; each upsert/delete swaps a
//! single map entry under the write lock without awaiting in between, so a
//! cancelled caller can never leave a half-written entry behind.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use ragchat_core::config::SimilarityMetric;
use ragchat_core::error::{Error, Result};
use ragchat_core::traits::VectorIndex;
use ragchat_core::types::{Document, Metadata, ScoredPassage, Vector};

use crate::metric::{finalize, similarity, validate_vector};

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    document: Document,
    vector: Vector,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    dim: usize,
    metric: SimilarityMetric,
    entries: Vec<Entry>,
}

pub struct MemoryIndex {
    dim: usize,
    metric: SimilarityMetric,
    entries: RwLock<HashMap<String, Arc<Entry>>>,
}

impl MemoryIndex {
    pub fn new(dim: usize, metric: SimilarityMetric) -> Self {
        Self { dim, metric, entries: RwLock::new(HashMap::new()) }
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    /// Load a snapshot written by [`MemoryIndex::save`]. A missing file yields an
    /// empty index; a snapshot of another dimensionality is a config error.
    pub async fn load_or_new(path: &Path, dim: usize, metric: SimilarityMetric) -> Result<Self> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no snapshot, starting empty");
                return Ok(Self::new(dim, metric));
            }
            Err(e) => return Err(Error::Storage(format!("{}: {}", path.display(), e))),
        };
        let snapshot: Snapshot = serde_json::from_slice(&raw).map_err(Error::storage)?;
        if snapshot.dim != dim {
            return Err(Error::InvalidConfig(format!(
                "snapshot {} has dim {}, embedder produces {}",
                path.display(),
                snapshot.dim,
                dim
            )));
        }
        if snapshot.metric != metric {
            tracing::warn!(stored = ?snapshot.metric, configured = ?metric, "snapshot metric differs, using configured metric");
        }
        let mut map = HashMap::with_capacity(snapshot.entries.len());
        for entry in snapshot.entries {
            validate_vector(dim, &entry.vector)?;
            map.insert(entry.document.id.clone(), Arc::new(entry));
        }
        tracing::info!(path = %path.display(), documents = map.len(), "loaded index snapshot");
        Ok(Self { dim, metric, entries: RwLock::new(map) })
    }

    /// Write all entries as JSON, via a temporary file renamed into place.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = {
            let entries = self.entries.read().await;
            let mut sorted: Vec<&Entry> = entries.values().map(|e| &**e).collect();
            sorted.sort_by(|a, b| a.document.id.cmp(&b.document.id));
            let snapshot = SnapshotRef { dim: self.dim, metric: self.metric, entries: sorted };
            serde_json::to_vec(&snapshot).map_err(Error::storage)?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(Error::storage)?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(Error::storage)?;
        tokio::fs::rename(&tmp, path).await.map_err(Error::storage)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    dim: usize,
    metric: SimilarityMetric,
    entries: Vec<&'a Entry>,
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn upsert(&self, document: Document, vector: Vector) -> Result<()> {
        validate_vector(self.dim, &vector)?;
        let entry = Arc::new(Entry { document, vector });
        let id = entry.document.id.clone();
        self.entries.write().await.insert(id, entry);
        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredPassage>> {
        validate_vector(self.dim, query)?;
        let mut scored: Vec<(f32, Arc<Entry>)> = {
            let entries = self.entries.read().await;
            if entries.is_empty() {
                return Err(Error::IndexEmpty);
            }
            entries
                .values()
                .map(|e| (similarity(self.metric, query, &e.vector), Arc::clone(e)))
                .collect()
        };
        // only the survivors' documents are cloned
        scored.sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then_with(|| a.document.id.cmp(&b.document.id)));
        scored.truncate(top_k);
        let passages = scored
            .into_iter()
            .map(|(score, e)| ScoredPassage { document: e.document.clone(), score, rank: 0 })
            .collect();
        Ok(finalize(passages, top_k))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.entries.write().await.remove(id).is_none() {
            tracing::debug!(id, "delete of absent document ignored");
        }
        Ok(())
    }

    async fn delete_where(&self, filters: &Metadata) -> Result<usize> {
        if filters.is_empty() {
            return Ok(0);
        }
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.document.matches(filters));
        Ok(before - entries.len())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_replaces_vector_for_same_id() {
        let index = MemoryIndex::new(2, SimilarityMetric::Cosine);
        index.upsert(Document::new("a", "first"), vec![1.0, 0.0]).await.unwrap();
        index.upsert(Document::new("a", "second"), vec![0.0, 1.0]).await.unwrap();
        assert_eq!(index.len().await.unwrap(), 1);
        let hits = index.search(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].document.text, "second");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }
}
