//! Configuration loading for both build commands.
//!
//! Uses Figment to merge one config file with `DOCIDX_*` env vars. Each
//! command pulls only the section it needs, so a lexical-only config never
//! trips over a missing `dense` section.

use figment::{
    providers::{Env, Format, Toml, Yaml},
    Figment,
};
use serde::de::DeserializeOwned;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::DuplicatePolicy;

/// Prefix of environment overrides; `__` separates nested keys.
pub const ENV_PREFIX: &str = "DOCIDX_";
/// Vector engine used when `dense.engine` is not set.
pub const DEFAULT_VECTOR_ENGINE: &str = "lance-flat-ip";

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Loads `path` (YAML for `.yaml`/`.yml`, TOML otherwise) and layers
    /// `DOCIDX_*` environment variables on top.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::InvalidConfig(format!("config file not found: {}", path.display())));
        }
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        let figment = if is_yaml {
            Figment::new().merge(Yaml::file(path))
        } else {
            Figment::new().merge(Toml::file(path))
        };
        Ok(Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__"))))
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Like [`Config::get`], but an absent key yields `default`. A present key
    /// with the wrong type is still an error.
    pub fn get_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: DeserializeOwned,
    {
        if self.figment.contains(key) { self.get(key) } else { Ok(default) }
    }

    pub fn path(&self, key: &str) -> Result<PathBuf> {
        let raw: String = self.get(key)?;
        if raw.trim().is_empty() {
            return Err(Error::InvalidConfig(format!("'{}' is empty", key)));
        }
        Ok(expand_path(raw))
    }

    pub fn lexical(&self) -> Result<LexicalSettings> {
        let settings = LexicalSettings {
            documents_path: self.path("data.documents_path")?,
            index_dir: self.path("index.whoosh_dir")?,
            writer_memory_mb: self.get_or("index.writer_memory_mb", 512)?,
            progress_every: self.get_or("index.progress_every", 50_000)?,
            sanity_query: self.get_or("index.sanity_query", "finances".to_string())?,
            duplicate_ids: self.get_or("index.duplicate_ids", DuplicatePolicy::default())?,
        };
        if settings.writer_memory_mb == 0 {
            return Err(Error::InvalidConfig("'index.writer_memory_mb' must be positive".into()));
        }
        if settings.progress_every == 0 {
            return Err(Error::InvalidConfig("'index.progress_every' must be positive".into()));
        }
        if settings.sanity_query.trim().is_empty() {
            return Err(Error::InvalidConfig("'index.sanity_query' is empty".into()));
        }
        Ok(settings)
    }

    pub fn dense(&self) -> Result<DenseSettings> {
        let settings = DenseSettings {
            embeddings_path: self.path("dense.embeddings_path")?,
            index_path: self.path("dense.faiss_path")?,
            idmap_path: self.path("dense.idmap_path")?,
            engine: self.get_or("dense.engine", DEFAULT_VECTOR_ENGINE.to_string())?,
        };
        settings.check_destinations()?;
        Ok(settings)
    }
}

/// Everything the lexical build reads from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalSettings {
    pub documents_path: PathBuf,
    /// Lexical index directory (`index.whoosh_dir`).
    pub index_dir: PathBuf,
    pub writer_memory_mb: usize,
    pub progress_every: usize,
    pub sanity_query: String,
    pub duplicate_ids: DuplicatePolicy,
}

/// Everything the dense build reads from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseSettings {
    pub embeddings_path: PathBuf,
    /// Vector index destination (`dense.faiss_path`).
    pub index_path: PathBuf,
    pub idmap_path: PathBuf,
    pub engine: String,
}

impl DenseSettings {
    /// The index directory and the ID map file must not overlap: neither
    /// may equal the other or lie inside it.
    pub fn check_destinations(&self) -> Result<()> {
        let index = without_cur_dir(&self.index_path);
        let idmap = without_cur_dir(&self.idmap_path);
        if idmap.starts_with(&index) || index.starts_with(&idmap) {
            return Err(Error::InvalidConfig(format!(
                "'dense.idmap_path' ({}) and 'dense.faiss_path' ({}) overlap",
                self.idmap_path.display(),
                self.index_path.display()
            )));
        }
        Ok(())
    }
}

fn without_cur_dir(path: &Path) -> PathBuf {
    path.components().filter(|c| !matches!(c, Component::CurDir)).collect()
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
