//! Flat inner-product vector index stored as a LanceDB table.
//!
//! Rows carry their insertion ordinal explicitly and no ANN index is ever
//! built, so every search is an exact dot-product scan. Over L2-normalized
//! rows the score equals cosine similarity.

use anyhow::{anyhow, Context, Result};
use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, UInt64Array};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{connect, Connection, DistanceType, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docidx_core::embedding::VectorMatrix;
use docidx_core::staging::StagedDir;
use docidx_core::traits::VectorIndex;
use docidx_core::types::OrdinalHit;
use docidx_core::Error;

use crate::schema::{build_vectors_schema, dim_of, DISTANCE_COLUMN, ORDINAL_COLUMN, VECTORS_TABLE, VECTOR_COLUMN};

/// Rows per record batch handed to LanceDB.
const ADD_BATCH_ROWS: usize = 1000;

async fn open_db(dir: &Path) -> Result<Connection> {
    Ok(connect(dir.to_string_lossy().as_ref()).execute().await?)
}

fn dim_to_i32(dim: usize) -> Result<i32> {
    i32::try_from(dim).map_err(|_| anyhow!("vector dimensionality {} exceeds the engine limit", dim))
}

pub struct LanceFlatIndex {
    table: Table,
    dim: usize,
    location: PathBuf,
    staged: Option<StagedDir>,
}

impl LanceFlatIndex {
    /// Whether `dir` holds a vector index written by this engine.
    pub fn exists(dir: &Path) -> bool {
        dir.join(format!("{}.lance", VECTORS_TABLE)).is_dir()
    }

    /// Creates an empty index that will replace `dest` on [`LanceFlatIndex::write`].
    ///
    /// Rows are written to a staging directory beside `dest`; until `write`
    /// succeeds, `dest` is left as it was.
    pub async fn create_flat(dest: &Path, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::EmptyCollection("vectors have zero dimensions".to_string()).into());
        }
        let schema = build_vectors_schema(dim_to_i32(dim)?);
        let staged = StagedDir::prepare(dest, Self::exists)?;
        let conn = open_db(staged.path()).await?;
        // create empty table with 0 rows
        let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
        let table = conn
            .create_table(VECTORS_TABLE, Box::new(iter))
            .execute()
            .await
            .with_context(|| format!("creating vector table in {}", staged.path().display()))?;
        tracing::debug!(dim, staging = %staged.path().display(), "created flat inner-product table");
        Ok(Self { table, dim, location: staged.path().to_path_buf(), staged: Some(staged) })
    }

    /// Opens a committed index and reads its dimensionality from the schema.
    pub async fn read(dir: &Path) -> Result<Self> {
        let conn = open_db(dir).await?;
        let table = conn
            .open_table(VECTORS_TABLE)
            .execute()
            .await
            .with_context(|| format!("opening vector index in {}", dir.display()))?;
        let schema = table.schema().await?;
        let dim = dim_of(&schema)
            .ok_or_else(|| Error::SchemaMismatch(format!("vector index in {} has no float vector column", dir.display())))?;
        Ok(Self { table, dim, location: dir.to_path_buf(), staged: None })
    }

    /// Swaps a freshly created index into its destination and returns that path.
    ///
    /// An index opened with [`LanceFlatIndex::read`] is already in place.
    pub fn write(self) -> Result<PathBuf> {
        let Self { table, location, staged, .. } = self;
        drop(table);
        match staged {
            Some(staged) => Ok(staged.commit()?),
            None => Ok(location),
        }
    }

    fn to_batch(&self, ordinals: Vec<u64>, rows: Vec<Option<Vec<Option<f32>>>>) -> Result<RecordBatch> {
        let dim = dim_to_i32(self.dim)?;
        Ok(RecordBatch::try_new(
            build_vectors_schema(dim),
            vec![
                Arc::new(UInt64Array::from(ordinals)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(rows.into_iter(), dim)),
            ],
        )?)
    }

    /// Every stored `(ordinal, vector)` pair, sorted by ordinal.
    pub async fn vectors(&self) -> Result<Vec<(u64, Vec<f32>)>> {
        let mut stream = self.table.query().select(Select::columns(&[ORDINAL_COLUMN, VECTOR_COLUMN])).execute().await?;
        let mut out = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            let ordinals = ordinal_column(&batch)?;
            let vectors = batch
                .column_by_name(VECTOR_COLUMN)
                .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
                .ok_or_else(|| Error::SchemaMismatch(format!("missing '{}' column", VECTOR_COLUMN)))?;
            for i in 0..batch.num_rows() {
                if !vectors.is_valid(i) {
                    continue;
                }
                let values = vectors.value(i).as_primitive::<Float32Type>().values().to_vec();
                out.push((ordinals.value(i), values));
            }
        }
        out.sort_by_key(|(ordinal, _)| *ordinal);
        Ok(out)
    }
}

fn ordinal_column(batch: &RecordBatch) -> Result<&UInt64Array> {
    Ok(batch
        .column_by_name(ORDINAL_COLUMN)
        .and_then(|c| c.as_any().downcast_ref::<UInt64Array>())
        .ok_or_else(|| Error::SchemaMismatch(format!("missing '{}' column", ORDINAL_COLUMN)))?)
}

#[async_trait]
impl VectorIndex for LanceFlatIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn add(&mut self, vectors: &VectorMatrix) -> Result<()> {
        if vectors.is_empty() {
            return Ok(());
        }
        if vectors.dim() != self.dim {
            return Err(Error::DimensionMismatch { row: 0, id: String::new(), expected: self.dim, found: vectors.dim() }.into());
        }
        let first = self.len().await? as u64;
        let mut batches = Vec::new();
        for (chunk_no, chunk) in vectors.as_slice().chunks(ADD_BATCH_ROWS * self.dim).enumerate() {
            let base = first + (chunk_no * ADD_BATCH_ROWS) as u64;
            let rows: Vec<Option<Vec<Option<f32>>>> = chunk.chunks_exact(self.dim).map(|r| Some(r.iter().map(|&x| Some(x)).collect())).collect();
            let ordinals = (0..rows.len() as u64).map(|i| base + i).collect();
            batches.push(self.to_batch(ordinals, rows)?);
        }
        let schema = build_vectors_schema(dim_to_i32(self.dim)?);
        let reader = Box::new(RecordBatchIterator::new(batches.into_iter().map(Ok), schema));
        self.table.add(reader).execute().await.context("adding vectors")?;
        tracing::debug!(rows = vectors.len(), first_ordinal = first, "added vectors");
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.table.count_rows(None).await?)
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<OrdinalHit>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { row: 0, id: "<query>".to_string(), expected: self.dim, found: query.len() }.into());
        }
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut stream = self
            .table
            .vector_search(query.to_vec())?
            .column(VECTOR_COLUMN)
            .distance_type(DistanceType::Dot)
            .bypass_vector_index()
            .limit(k)
            .execute()
            .await?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            let ordinals = ordinal_column(&batch)?;
            let distances = batch
                .column_by_name(DISTANCE_COLUMN)
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| Error::SchemaMismatch(format!("search results lack '{}'", DISTANCE_COLUMN)))?;
            for i in 0..batch.num_rows() {
                // lance reports dot distance as 1 - <q, v>
                hits.push(OrdinalHit { ordinal: ordinals.value(i), score: 1.0 - distances.value(i) });
            }
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.ordinal.cmp(&b.ordinal)));
        hits.truncate(k);
        Ok(hits)
    }
}
