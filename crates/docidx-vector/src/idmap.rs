use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use docidx_core::staging::StagedFile;

/// Ordinal -> logical id, index-aligned with insertion order into the vector index.
///
/// Persisted as a JSON array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMap {
    ids: Vec<String>,
}

impl IdMap {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn get(&self, ordinal: u64) -> Option<&str> {
        usize::try_from(ordinal).ok().and_then(|i| self.ids.get(i)).map(String::as_str)
    }

    /// Serializes into a temp file beside `path`; nothing at `path` changes
    /// until the returned file is committed.
    pub fn stage(&self, path: &Path) -> Result<StagedFile> {
        let mut staged = StagedFile::prepare(path)?;
        let bytes = serde_json::to_vec(&self.ids).context("serializing id map")?;
        staged.write_all(&bytes)?;
        Ok(staged)
    }

    pub fn write(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.stage(path)?.commit()?)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening id map {}", path.display()))?;
        let ids: Vec<String> =
            serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing id map {}", path.display()))?;
        Ok(Self { ids })
    }
}
