//! LanceDB-backed vector index.
//!
//! One table holds `id`, `text`, `metadata` (JSON) and the vector. Upserts go
//! through `merge_insert` keyed on `id`, so each call commits one new table
//! version atomically. Searches over-fetch from LanceDB, rescore locally with
//! the configured metric, and apply the id tie-break before truncating.

use arrow_array::cast::AsArray;
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{connect, Connection, DistanceType, Table};
use std::sync::Arc;
use tokio::sync::Mutex;

use ragchat_core::config::SimilarityMetric;
use ragchat_core::error::{Error, Result};
use ragchat_core::traits::VectorIndex;
use ragchat_core::types::{Document, Metadata, ScoredPassage, Vector};

use crate::metric::{finalize, similarity, validate_vector};
use crate::schema::{build_documents_schema, stored_vector_dim};

/// Candidates fetched per requested result, so ties at the cut are resolved locally.
const OVERFETCH: usize = 4;

pub struct LanceIndex {
    conn: Connection,
    table_name: String,
    dim: usize,
    metric: SimilarityMetric,
    write_lock: Mutex<()>,
}

impl LanceIndex {
    pub async fn open(uri: &str, table_name: &str, dim: usize, metric: SimilarityMetric) -> Result<Self> {
        let conn = connect(uri).execute().await.map_err(Error::storage)?;
        let names = conn.table_names().execute().await.map_err(Error::storage)?;
        if names.iter().any(|n| n == table_name) {
            let table = conn.open_table(table_name).execute().await.map_err(Error::storage)?;
            let schema = table.schema().await.map_err(Error::storage)?;
            let stored = stored_vector_dim(&schema);
            if stored != Some(dim) {
                return Err(Error::InvalidConfig(format!(
                    "table '{table_name}' at {uri} stores vectors of dim {stored:?}, embedder produces {dim}"
                )));
            }
        } else {
            let schema = build_documents_schema(dim);
            let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
            conn.create_table(table_name, Box::new(iter)).execute().await.map_err(Error::storage)?;
            tracing::info!(uri, table = table_name, "created LanceDB table");
        }
        Ok(Self { conn, table_name: table_name.to_string(), dim, metric, write_lock: Mutex::new(()) })
    }

    async fn table(&self) -> Result<Table> {
        self.conn.open_table(&self.table_name).execute().await.map_err(Error::storage)
    }

    fn distance_type(&self) -> DistanceType {
        match self.metric {
            SimilarityMetric::Cosine => DistanceType::Cosine,
            SimilarityMetric::Dot => DistanceType::Dot,
            SimilarityMetric::Euclidean => DistanceType::L2,
        }
    }

    fn to_record_batch(&self, document: &Document, vector: &[f32]) -> Result<RecordBatch> {
        let metadata = serde_json::to_string(&document.metadata).map_err(Error::storage)?;
        let vectors = vec![Some(vector.iter().map(|&x| Some(x)).collect::<Vec<_>>())];
        let dim = i32::try_from(self.dim).map_err(Error::storage)?;
        RecordBatch::try_new(
            build_documents_schema(self.dim),
            vec![
                Arc::new(StringArray::from(vec![document.id.clone()])),
                Arc::new(StringArray::from(vec![document.text.clone()])),
                Arc::new(StringArray::from(vec![metadata])),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                    vectors.into_iter(),
                    dim,
                )),
            ],
        )
        .map_err(Error::storage)
    }
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::Storage(format!("column '{name}' missing or not utf8")))
}

fn passages_from_batch(batch: &RecordBatch, metric: SimilarityMetric, query: &[f32]) -> Result<Vec<ScoredPassage>> {
    let ids = string_col(batch, "id")?;
    let texts = string_col(batch, "text")?;
    let metas = string_col(batch, "metadata")?;
    let vectors = batch
        .column_by_name("vector")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| Error::Storage("column 'vector' missing".into()))?;
    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let list = vectors.value(i);
        let vector: Vec<f32> = list.as_primitive::<arrow_array::types::Float32Type>().values().iter().copied().collect();
        let metadata: Metadata = serde_json::from_str(metas.value(i)).map_err(Error::storage)?;
        let document = Document { id: ids.value(i).to_string(), text: texts.value(i).to_string(), metadata };
        out.push(ScoredPassage { score: similarity(metric, query, &vector), document, rank: 0 });
    }
    Ok(out)
}

#[async_trait]
impl VectorIndex for LanceIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn upsert(&self, document: Document, vector: Vector) -> Result<()> {
        validate_vector(self.dim, &vector)?;
        let batch = self.to_record_batch(&document, &vector)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let _guard = self.write_lock.lock().await;
        let table = self.table().await?;
        let mut mi = table.merge_insert(&["id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await.map_err(Error::storage)?;
        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredPassage>> {
        validate_vector(self.dim, query)?;
        let table = self.table().await?;
        if table.count_rows(None).await.map_err(Error::storage)? == 0 {
            return Err(Error::IndexEmpty);
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let mut stream = table
            .vector_search(query.to_vec())
            .map_err(Error::storage)?
            .distance_type(self.distance_type())
            .limit(top_k.saturating_mul(OVERFETCH).max(top_k))
            .execute()
            .await
            .map_err(Error::storage)?;
        let mut passages = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::storage)? {
            passages.extend(passages_from_batch(&batch, self.metric, query)?);
        }
        Ok(finalize(passages, top_k))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let table = self.table().await?;
        table.delete(&format!("id = '{}'", id.replace('\'', "''"))).await.map_err(Error::storage)?;
        Ok(())
    }

    async fn delete_where(&self, filters: &Metadata) -> Result<usize> {
        if filters.is_empty() {
            return Ok(0);
        }
        let _guard = self.write_lock.lock().await;
        let table = self.table().await?;
        let mut stream = table
            .query()
            .select(Select::columns(&["id", "metadata"]))
            .execute()
            .await
            .map_err(Error::storage)?;
        let mut matched = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::storage)? {
            let ids = string_col(&batch, "id")?;
            let metas = string_col(&batch, "metadata")?;
            for i in 0..batch.num_rows() {
                let metadata: Metadata = serde_json::from_str(metas.value(i)).map_err(Error::storage)?;
                let row = Document { id: ids.value(i).to_string(), text: String::new(), metadata };
                if row.matches(filters) {
                    matched.push(format!("'{}'", row.id.replace('\'', "''")));
                }
            }
        }
        if !matched.is_empty() {
            table.delete(&format!("id IN ({})", matched.join(", "))).await.map_err(Error::storage)?;
        }
        Ok(matched.len())
    }

    async fn len(&self) -> Result<usize> {
        self.table().await?.count_rows(None).await.map_err(Error::storage)
    }
}
