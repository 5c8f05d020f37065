//! Dense index build: precomputed embeddings in, a flat inner-product index
//! plus its ID map out.

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

use docidx_core::config::{DenseSettings, DEFAULT_VECTOR_ENGINE};
use docidx_core::embedding::{load_embeddings, normalize_l2};
use docidx_core::traits::VectorIndex;
use docidx_core::types::{OrdinalHit, SearchHit, SourceKind};
use docidx_core::Error;

use crate::engine::VectorEngineKind;
use crate::idmap::IdMap;
use crate::index::LanceFlatIndex;

#[derive(Debug, Clone, PartialEq)]
pub struct DenseBuildReport {
    pub vectors: usize,
    pub dim: usize,
    /// Ordinals of rows stored as zero vectors.
    pub zero_norm_rows: Vec<usize>,
    pub duplicate_ids: usize,
    pub index_path: PathBuf,
    pub idmap_path: PathBuf,
}

impl fmt::Display for DenseBuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wrote index {}, wrote id map {}", self.index_path.display(), self.idmap_path.display())
    }
}

pub struct DenseBuilder {
    settings: DenseSettings,
}

impl DenseBuilder {
    pub fn new(settings: DenseSettings) -> Self {
        Self { settings }
    }

    pub fn with_paths(embeddings_path: &Path, index_path: &Path, idmap_path: &Path) -> Self {
        Self::new(DenseSettings {
            embeddings_path: embeddings_path.to_path_buf(),
            index_path: index_path.to_path_buf(),
            idmap_path: idmap_path.to_path_buf(),
            engine: DEFAULT_VECTOR_ENGINE.to_string(),
        })
    }

    /// Loads, normalizes and indexes every embedding, then persists the ID map.
    ///
    /// The engine and the destination layout are checked before any file is
    /// read. Neither destination is touched until the index holds exactly one
    /// row per id; the index is swapped in first and the ID map right after it.
    pub async fn build(&self) -> Result<DenseBuildReport> {
        let s = &self.settings;
        let engine = VectorEngineKind::resolve(&s.engine)?;
        s.check_destinations()?;

        tracing::info!("Loading embeddings from {}", s.embeddings_path.display());
        let mut set = load_embeddings(&s.embeddings_path)?;
        let (n, dim) = (set.len(), set.vectors.dim());
        tracing::info!(vectors = n, dim, engine = engine.name(), "loaded embeddings");

        let zero_norm_rows = normalize_l2(&mut set.vectors);
        if !zero_norm_rows.is_empty() {
            tracing::warn!(
                count = zero_norm_rows.len(),
                first = zero_norm_rows[0],
                "zero-norm vectors stored unnormalized; they score 0 against every query"
            );
        }
        let duplicate_ids = set.duplicate_ids();
        if duplicate_ids > 0 {
            tracing::warn!(duplicate_ids, "embedding ids repeat; every occurrence keeps its own ordinal");
        }

        let id_map = IdMap::new(set.ids);
        let staged_ids = id_map.stage(&s.idmap_path)?;

        let mut index = match engine {
            VectorEngineKind::LanceFlatIp => LanceFlatIndex::create_flat(&s.index_path, dim).await?,
        };
        index.add(&set.vectors).await?;
        let stored = index.len().await?;
        if stored != n || id_map.len() != n {
            anyhow::bail!("vector index holds {} rows but {} ids were loaded", stored, id_map.len());
        }

        let index_path = index.write().context("persisting vector index")?;
        let idmap_path = staged_ids.commit().context("persisting id map")?;
        tracing::info!("Wrote {} vectors (dim={}) to {} and id map to {}", n, dim, index_path.display(), idmap_path.display());

        Ok(DenseBuildReport { vectors: n, dim, zero_norm_rows, duplicate_ids, index_path, idmap_path })
    }
}

/// Translates ordinal hits into logical ids via the ID map.
pub fn resolve_hits(hits: &[OrdinalHit], id_map: &IdMap) -> Result<Vec<SearchHit>, Error> {
    hits.iter()
        .map(|hit| {
            let id = id_map.get(hit.ordinal).ok_or_else(|| {
                Error::SchemaMismatch(format!("ordinal {} is outside the id map ({} entries)", hit.ordinal, id_map.len()))
            })?;
            Ok(SearchHit { id: id.to_string(), score: hit.score, source: SourceKind::Vector })
        })
        .collect()
}
