//! Streaming reader for JSON-lines document corpora.
//!
//! Each non-blank line must hold one JSON object. Objects are resolved into
//! [`DocumentRecord`]s or classified as skipped; anything that is not a JSON
//! object aborts the stream with the offending line number.

use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{DocumentRecord, DocumentSource};

/// Canonical title key.
pub const TITLE_KEY: &str = "title";
/// Body keys in priority order. The first present, non-empty one wins.
pub const CONTENT_ALIASES: [&str; 3] = ["content", "post_content", "description"];

/// Why a well-formed record produced no lexical entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingId,
    EmptyText,
}

/// Outcome of one non-blank corpus line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Valid(DocumentRecord),
    Skipped(SkipReason),
}

/// Renders a scalar as text. `None` for null, `false`, `0`, `""` and
/// containers, which all count as absent.
fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// The logical id of a record, if it has a usable one.
pub fn record_id(obj: &Map<String, Value>) -> Option<String> {
    obj.get("id").and_then(truthy_text)
}

fn content_alias(obj: &Map<String, Value>) -> Option<(&'static str, String)> {
    CONTENT_ALIASES
        .iter()
        .find_map(|key| obj.get(*key).and_then(truthy_text).map(|text| (*key, text)))
}

/// Pulls `(title, content)` out of a record. Absent fields come back as
/// empty strings; that is a filtering signal, not an error.
pub fn extract(obj: &Map<String, Value>) -> (String, String) {
    let title = obj.get(TITLE_KEY).and_then(truthy_text).unwrap_or_default();
    let content = content_alias(obj).map(|(_, text)| text).unwrap_or_default();
    (title, content)
}

/// Resolves a parsed object into a record or a skip reason.
pub fn resolve(obj: &Map<String, Value>) -> LineOutcome {
    let Some(id) = record_id(obj) else {
        return LineOutcome::Skipped(SkipReason::MissingId);
    };
    let title = obj.get(TITLE_KEY).and_then(truthy_text).unwrap_or_default();
    let (source, content) = match content_alias(obj) {
        Some(("content", text)) => (DocumentSource::MiniCorpus, text),
        Some((_, text)) => (DocumentSource::FullCorpus, text),
        None => (DocumentSource::Untyped, String::new()),
    };
    if title.is_empty() && content.is_empty() {
        return LineOutcome::Skipped(SkipReason::EmptyText);
    }
    LineOutcome::Valid(DocumentRecord { id, title, content, source })
}

/// Iterates `(line_number, outcome)` over the non-blank lines of a corpus.
///
/// Line numbers are 1-based and count blank lines, so they point at the
/// physical line in the file. The first error ends the iteration.
pub struct CorpusReader<R> {
    lines: Lines<R>,
    path: PathBuf,
    line_no: usize,
    failed: bool,
}

impl CorpusReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<R: BufRead> CorpusReader<R> {
    pub fn new(reader: R, path: &Path) -> Self {
        Self { lines: reader.lines(), path: path.to_path_buf(), line_no: 0, failed: false }
    }

    fn malformed(&mut self, reason: String) -> Error {
        self.failed = true;
        Error::MalformedRecord { path: self.path.clone(), line: self.line_no, reason }
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = Result<(usize, LineOutcome)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let raw = self.lines.next()?;
            self.line_no += 1;
            let raw = match raw {
                Ok(raw) => raw,
                Err(e) => return Some(Err(self.malformed(e.to_string()))),
            };
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let outcome = match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(obj)) => resolve(&obj),
                Ok(other) => {
                    let kind = match other {
                        Value::Array(_) => "array",
                        Value::String(_) => "string",
                        Value::Number(_) => "number",
                        Value::Bool(_) => "boolean",
                        _ => "null",
                    };
                    return Some(Err(self.malformed(format!("expected a JSON object, found {kind}"))));
                }
                Err(e) => return Some(Err(self.malformed(e.to_string()))),
            };
            return Some(Ok((self.line_no, outcome)));
        }
    }
}
