use async_trait::async_trait;

use crate::embedding::VectorMatrix;
use crate::types::{DocumentRecord, LexicalField, OrdinalHit, SearchHit};

/// Write side of a lexical engine: entries become visible only after
/// [`LexicalWriter::commit`].
pub trait LexicalWriter {
    fn add_entry(&mut self, record: &DocumentRecord) -> anyhow::Result<()>;
    /// Makes every added entry durable; returns the number of entries committed.
    fn commit(&mut self) -> anyhow::Result<u64>;
}

pub trait LexicalSearcher {
    fn query(&self, field: LexicalField, text: &str, limit: usize) -> anyhow::Result<Vec<SearchHit>>;
    fn num_docs(&self) -> anyhow::Result<u64>;
}

/// A flat inner-product vector store. Vectors carry no identity beyond
/// their insertion ordinal.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;
    /// Appends all rows; the first row gets ordinal `len()` before the call.
    async fn add(&mut self, vectors: &VectorMatrix) -> anyhow::Result<()>;
    async fn len(&self) -> anyhow::Result<usize>;
    async fn search(&self, query: &[f32], k: usize) -> anyhow::Result<Vec<OrdinalHit>>;
}
