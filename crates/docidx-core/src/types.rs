//! Domain types shared by the lexical and dense builders.

use serde::{Deserialize, Serialize};

/// Stored, unanalyzed unique key of every lexical entry.
pub const DOC_ID_FIELD: &str = "doc_id";
/// Analyzed title field. Query code depends on this exact name.
pub const TITLE_FIELD: &str = "title";
/// Analyzed body field. Query code depends on this exact name.
pub const CONTENT_FIELD: &str = "content";

/// Fields of the lexical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexicalField {
    DocId,
    Title,
    Content,
}

impl LexicalField {
    pub const fn name(self) -> &'static str {
        match self {
            Self::DocId => DOC_ID_FIELD,
            Self::Title => TITLE_FIELD,
            Self::Content => CONTENT_FIELD,
        }
    }
}

impl std::fmt::Display for LexicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which corpus layout a record was recognized as, decided by the alias its
/// content was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentSource {
    /// Body under `content`.
    MiniCorpus,
    /// Body under `post_content` or `description`.
    FullCorpus,
    /// No body field present; the record can still be indexed by title.
    Untyped,
}

/// A validated document ready to become one lexical entry.
///
/// `id` is non-empty and at least one of `title`/`content` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub source: DocumentSource,
}

/// What to do when the corpus repeats a document id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Abort the build before commit.
    #[default]
    Fail,
    /// Keep the first occurrence; later ones are counted as skipped.
    FirstWins,
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
}

/// A hit carrying a logical document id.
///
/// `score` is engine-specific but higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub source: SourceKind,
}

/// A raw vector-engine hit: the ordinal the vector was inserted at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrdinalHit {
    pub ordinal: u64,
    pub score: f32,
}
