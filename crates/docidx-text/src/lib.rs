//! docidx-text
//!
//! Tantivy-backed lexical index: the fixed `doc_id`/`title`/`content` schema,
//! a stemming analyzer, and the corpus-to-index build.

pub mod builder;
pub mod index;
pub mod schema;

pub use builder::{ingest, self_check, IngestOptions, IngestReport, LexicalBuildReport, LexicalBuilder, SanityCheck};
pub use index::{TantivyLexicalIndex, TantivyLexicalWriter};
