//! docidx-core
//!
//! Shared pieces of the lexical and dense index builds: record and embedding
//! parsing, L2 normalization, configuration, errors, engine capability
//! traits and staged destination replacement.

pub mod config;
pub mod embedding;
pub mod error;
pub mod record;
pub mod staging;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
