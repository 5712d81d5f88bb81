//! ragchat-vector
//!
//! Vector index implementations behind `ragchat_core::traits::VectorIndex`.
//! `MemoryIndex` is exact and snapshot-persisted; `LanceIndex` (feature
//! `lancedb`) stores documents in a LanceDB table.

use std::path::PathBuf;
use std::sync::Arc;

use ragchat_core::config::IndexSettings;
use ragchat_core::error::{Error, Result};
use ragchat_core::traits::VectorIndex;

pub mod memory;
pub mod metric;

#[cfg(feature = "lancedb")]
pub mod lance;
#[cfg(feature = "lancedb")]
pub mod schema;

#[cfg(feature = "lancedb")]
pub use lance::LanceIndex;
pub use memory::MemoryIndex;

/// An index opened from settings, keeping the concrete type where the caller
/// needs backend-specific persistence.
pub enum OpenedIndex {
    Memory { index: Arc<MemoryIndex>, snapshot: PathBuf },
    #[cfg(feature = "lancedb")]
    Lance(Arc<LanceIndex>),
}

impl OpenedIndex {
    pub async fn open(settings: &IndexSettings, dim: usize) -> Result<Self> {
        let path = settings.resolved_path();
        match settings.backend.as_str() {
            "memory" => {
                let index = MemoryIndex::load_or_new(&path, dim, settings.similarity_metric).await?;
                Ok(OpenedIndex::Memory { index: Arc::new(index), snapshot: path })
            }
            #[cfg(feature = "lancedb")]
            "lancedb" => {
                let uri = path.to_string_lossy();
                let index = LanceIndex::open(&uri, &settings.table, dim, settings.similarity_metric).await?;
                Ok(OpenedIndex::Lance(Arc::new(index)))
            }
            #[cfg(not(feature = "lancedb"))]
            "lancedb" => Err(Error::InvalidConfig("index backend 'lancedb' requires the `lancedb` feature".into())),
            other => Err(Error::InvalidConfig(format!("unknown index backend '{other}'"))),
        }
    }

    pub fn handle(&self) -> Arc<dyn VectorIndex> {
        match self {
            OpenedIndex::Memory { index, .. } => Arc::clone(index) as Arc<dyn VectorIndex>,
            #[cfg(feature = "lancedb")]
            OpenedIndex::Lance(index) => Arc::clone(index) as Arc<dyn VectorIndex>,
        }
    }

    /// Flush state that is not already durable. LanceDB commits on every write.
    pub async fn persist(&self) -> Result<()> {
        match self {
            OpenedIndex::Memory { index, snapshot } => index.save(snapshot).await,
            #[cfg(feature = "lancedb")]
            OpenedIndex::Lance(_) => Ok(()),
        }
    }
}
