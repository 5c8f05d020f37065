//! Precomputed embedding collections and L2 normalization.
//!
//! Two on-disk JSON shapes are accepted and resolved once into an
//! [`EmbeddingSet`]:
//!
//! - parallel arrays: `{"ids": [...], "embeddings": [[...], ...]}`
//! - id-keyed mapping: `{"<id>": [...], ...}`, taken in file order
//!
//! The order of `EmbeddingSet::ids` is the insertion order into the vector
//! engine and therefore the order of the persisted ID map.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Error, Result};

/// Raw input as found on disk, before validation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingSource {
    ParallelArrays { ids: Vec<Value>, embeddings: Vec<Vec<f64>> },
    IdKeyedMapping(IdKeyedMapping),
}

/// An id -> vector object whose entries keep their document order.
#[derive(Debug, Default)]
pub struct IdKeyedMapping(pub Vec<(String, Vec<f64>)>);

impl<'de> Deserialize<'de> for IdKeyedMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = IdKeyedMapping;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping ids to vectors")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((id, vector)) = map.next_entry::<String, Vec<f64>>()? {
                    entries.push((id, vector));
                }
                Ok(IdKeyedMapping(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// A dense row-major `n x d` matrix of `f32`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatrix {
    dim: usize,
    data: Vec<f32>,
}

impl VectorMatrix {
    /// Builds a matrix from equally sized rows. `dim` must be non-zero.
    pub fn from_rows<I>(dim: usize, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<f32>>,
    {
        if dim == 0 {
            return Err(Error::EmptyCollection("vectors have zero dimensions".to_string()));
        }
        let mut data = Vec::new();
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != dim {
                return Err(Error::DimensionMismatch { row, id: String::new(), expected: dim, found: values.len() });
            }
            data.extend_from_slice(&values);
        }
        Ok(Self { dim, data })
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn len(&self) -> usize { self.data.len() / self.dim }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        self.data.get(i * self.dim..(i + 1) * self.dim)
    }

    pub fn rows(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.dim)
    }

    pub fn as_slice(&self) -> &[f32] { &self.data }
}

/// Ids and vectors, index-aligned.
#[derive(Debug, Clone)]
pub struct EmbeddingSet {
    pub ids: Vec<String>,
    pub vectors: VectorMatrix,
}

impl EmbeddingSet {
    /// Validates raw input: equal lengths, non-empty, one shared non-zero
    /// dimensionality, finite values after the cast to `f32`.
    pub fn from_source(source: EmbeddingSource) -> Result<Self> {
        let entries: Vec<(String, Vec<f64>)> = match source {
            EmbeddingSource::ParallelArrays { ids, embeddings } => {
                if ids.len() != embeddings.len() {
                    return Err(Error::LengthMismatch { ids: ids.len(), vectors: embeddings.len() });
                }
                let ids = ids
                    .into_iter()
                    .enumerate()
                    .map(|(row, id)| match id {
                        Value::String(s) => Ok(s),
                        Value::Number(n) => Ok(n.to_string()),
                        other => Err(Error::InvalidEmbeddingId { row, found: other.to_string() }),
                    })
                    .collect::<Result<Vec<_>>>()?;
                ids.into_iter().zip(embeddings).collect()
            }
            EmbeddingSource::IdKeyedMapping(IdKeyedMapping(entries)) => entries,
        };

        let Some(dim) = entries.first().map(|(_, v)| v.len()) else {
            return Err(Error::EmptyCollection("no vectors".to_string()));
        };
        if dim == 0 {
            return Err(Error::EmptyCollection("vectors have zero dimensions".to_string()));
        }

        let mut ids = Vec::with_capacity(entries.len());
        let mut data = Vec::with_capacity(entries.len() * dim);
        for (row, (id, values)) in entries.into_iter().enumerate() {
            if values.len() != dim {
                return Err(Error::DimensionMismatch { row, id, expected: dim, found: values.len() });
            }
            for (column, x) in values.into_iter().enumerate() {
                #[allow(clippy::cast_possible_truncation)]
                let x = x as f32;
                if !x.is_finite() {
                    return Err(Error::NonFiniteValue { row, id, column });
                }
                data.push(x);
            }
            ids.push(id);
        }
        Ok(Self { ids, vectors: VectorMatrix { dim, data } })
    }

    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    /// Number of ids that repeat an earlier id.
    pub fn duplicate_ids(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.ids.len());
        self.ids.iter().filter(|id| !seen.insert(id.as_str())).count()
    }
}

/// Reads and validates an embeddings file.
pub fn load_embeddings(path: &Path) -> Result<EmbeddingSet> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let source: EmbeddingSource = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::MalformedEmbeddings { path: path.to_path_buf(), reason: e.to_string() })?;
    EmbeddingSet::from_source(source)
}

/// Scales every row to unit Euclidean norm in place so inner product equals
/// cosine similarity.
///
/// Rows whose norm is zero are left as zero vectors; their ordinals are
/// returned so callers can report them.
pub fn normalize_l2(matrix: &mut VectorMatrix) -> Vec<usize> {
    let mut zero_rows = Vec::new();
    for (i, row) in matrix.data.chunks_exact_mut(matrix.dim).enumerate() {
        let norm = l2_norm(row);
        if norm > 0.0 {
            let inv = 1.0 / norm;
            for x in row.iter_mut() {
                #[allow(clippy::cast_possible_truncation)]
                let scaled = (f64::from(*x) * inv) as f32;
                *x = scaled;
            }
        } else {
            zero_rows.push(i);
        }
    }
    zero_rows
}

/// Euclidean norm of a row, computed in `f64`.
pub fn l2_norm(row: &[f32]) -> f64 {
    row.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}
