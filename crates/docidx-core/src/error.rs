use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed record at {}:{line}: {reason}", path.display())]
    MalformedRecord { path: PathBuf, line: usize, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed embeddings file {}: {reason}", path.display())]
    MalformedEmbeddings { path: PathBuf, reason: String },

    #[error("Embedding id at row {row} is not a string or number: {found}")]
    InvalidEmbeddingId { row: usize, found: String },

    #[error("Dimension mismatch at row {row} (id {id:?}): expected {expected}, found {found}")]
    DimensionMismatch { row: usize, id: String, expected: usize, found: usize },

    #[error("Length mismatch: {ids} ids but {vectors} vectors")]
    LengthMismatch { ids: usize, vectors: usize },

    #[error("Empty embedding collection: {0}")]
    EmptyCollection(String),

    #[error("Non-finite value at row {row} (id {id:?}), column {column}")]
    NonFiniteValue { row: usize, id: String, column: usize },

    #[error("Duplicate document id {id:?} at line {line}")]
    DuplicateId { id: String, line: usize },

    #[error("Refusing to replace {}: directory is not empty and holds no index", path.display())]
    DestinationOccupied { path: PathBuf },

    #[error("Vector engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
