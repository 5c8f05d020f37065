//! Lexical index build: stream a JSON-lines corpus into a fresh tantivy index.
//!
//! The index is built in a staging directory beside the destination and only
//! swapped in after a successful commit, so a failed build leaves the previous
//! index in place. After the swap a sanity query is run against `content`.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use docidx_core::config::LexicalSettings;
use docidx_core::record::{CorpusReader, LineOutcome};
use docidx_core::staging::StagedDir;
use docidx_core::traits::{LexicalSearcher, LexicalWriter};
use docidx_core::types::{DocumentSource, DuplicatePolicy, LexicalField};
use docidx_core::Error;

use crate::index::TantivyLexicalIndex;

/// Hits requested by the post-build sanity query.
pub const SANITY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub duplicate_ids: DuplicatePolicy,
    pub progress_every: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { duplicate_ids: DuplicatePolicy::default(), progress_every: 50_000 }
    }
}

/// Counters for one pass over a corpus.
///
/// `indexed + skipped` equals the number of non-blank lines read.
/// `duplicates` is the subset of `skipped` dropped by [`DuplicatePolicy::FirstWins`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub indexed: u64,
    pub skipped: u64,
    pub duplicates: u64,
    pub mini_corpus: u64,
    pub full_corpus: u64,
    pub untyped: u64,
}

/// Feeds every valid record into `writer` without committing.
///
/// A corrupt line or, under [`DuplicatePolicy::Fail`], a repeated id stops
/// ingestion with an error; the caller must then discard the writer.
pub fn ingest<I, W>(records: I, writer: &mut W, opts: IngestOptions, progress: &ProgressBar) -> Result<IngestReport>
where
    I: IntoIterator<Item = docidx_core::Result<(usize, LineOutcome)>>,
    W: LexicalWriter,
{
    let mut report = IngestReport::default();
    let mut seen: HashSet<String> = HashSet::new();
    let every = opts.progress_every.max(1) as u64;

    for item in records {
        let (line, outcome) = item?;
        let record = match outcome {
            LineOutcome::Valid(record) => record,
            LineOutcome::Skipped(reason) => {
                tracing::debug!(line, ?reason, "skipping record");
                report.skipped += 1;
                continue;
            }
        };
        if !seen.insert(record.id.clone()) {
            match opts.duplicate_ids {
                DuplicatePolicy::Fail => return Err(Error::DuplicateId { id: record.id, line }.into()),
                DuplicatePolicy::FirstWins => {
                    tracing::debug!(line, id = %record.id, "skipping duplicate id");
                    report.skipped += 1;
                    report.duplicates += 1;
                    continue;
                }
            }
        }

        writer.add_entry(&record).with_context(|| format!("adding document {:?} from line {}", record.id, line))?;
        report.indexed += 1;
        match record.source {
            DocumentSource::MiniCorpus => report.mini_corpus += 1,
            DocumentSource::FullCorpus => report.full_corpus += 1,
            DocumentSource::Untyped => report.untyped += 1,
        }
        progress.inc(1);
        if report.indexed % every == 0 {
            tracing::info!("indexed {} docs...", report.indexed);
        }
    }
    Ok(report)
}

/// Result of the post-build sanity query.
#[derive(Debug, Clone, PartialEq)]
pub struct SanityCheck {
    pub query: String,
    pub hits: usize,
    pub example_doc_id: Option<String>,
}

/// Runs `query` against `content` in the index at `index_dir`.
///
/// Zero hits on a non-empty index is logged as a warning, never an error: a
/// corpus may legitimately not contain the term.
pub fn self_check(index_dir: &Path, query: &str, indexed: u64) -> Result<SanityCheck> {
    let index = TantivyLexicalIndex::open(index_dir)?;
    let hits = index.query(LexicalField::Content, query, SANITY_LIMIT)?;
    tracing::info!("sanity hits for '{}': {}", query, hits.len());
    if let Some(first) = hits.first() {
        tracing::info!("example doc_id: {}", first.id);
    } else if indexed > 0 {
        tracing::warn!(query, indexed, "sanity query returned no hits; check the corpus and the content field aliases");
    }
    Ok(SanityCheck { query: query.to_string(), hits: hits.len(), example_doc_id: hits.first().map(|h| h.id.clone()) })
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexicalBuildReport {
    pub indexed: u64,
    pub skipped: u64,
    pub ingest: IngestReport,
    pub index_dir: PathBuf,
    pub sanity: SanityCheck,
}

pub struct LexicalBuilder {
    settings: LexicalSettings,
}

impl LexicalBuilder {
    pub fn new(settings: LexicalSettings) -> Self {
        Self { settings }
    }

    /// Default settings for a corpus and destination.
    pub fn with_paths(corpus_path: &Path, destination: &Path) -> Self {
        Self::new(LexicalSettings {
            documents_path: corpus_path.to_path_buf(),
            index_dir: destination.to_path_buf(),
            writer_memory_mb: 512,
            progress_every: 50_000,
            sanity_query: "finances".to_string(),
            duplicate_ids: DuplicatePolicy::default(),
        })
    }

    pub fn build(&self) -> Result<LexicalBuildReport> {
        let s = &self.settings;
        let reader = CorpusReader::open(&s.documents_path)?;
        let staged = StagedDir::prepare(&s.index_dir, TantivyLexicalIndex::exists)?;
        if TantivyLexicalIndex::exists(&s.index_dir) {
            tracing::info!("Index already exists at {}. Rebuilding...", s.index_dir.display());
        }

        let progress = ProgressBar::new_spinner();
        progress.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} docs indexed ({per_sec})")?);
        let opts = IngestOptions { duplicate_ids: s.duplicate_ids, progress_every: s.progress_every };

        let ingest_report = {
            let index = TantivyLexicalIndex::create(staged.path())?;
            let mut writer = index.writer(s.writer_memory_mb)?;
            let report = ingest(reader, &mut writer, opts, &progress)?;
            let committed = writer.commit().context("committing lexical index")?;
            writer.finish()?;
            if committed != report.indexed {
                anyhow::bail!("committed {} entries but indexed {}", committed, report.indexed);
            }
            report
        };
        progress.finish_and_clear();

        let index_dir = staged.commit()?;
        tracing::info!(
            "Done. Indexed {} docs into {} (skipped={}, duplicates={}, mini={}, full={}, untyped={})",
            ingest_report.indexed,
            index_dir.display(),
            ingest_report.skipped,
            ingest_report.duplicates,
            ingest_report.mini_corpus,
            ingest_report.full_corpus,
            ingest_report.untyped,
        );

        let sanity = self_check(&index_dir, &s.sanity_query, ingest_report.indexed)?;
        Ok(LexicalBuildReport {
            indexed: ingest_report.indexed,
            skipped: ingest_report.skipped,
            ingest: ingest_report,
            index_dir,
            sanity,
        })
    }
}

impl std::fmt::Display for LexicalBuildReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "indexed={} skipped={}", self.indexed, self.skipped)
    }
}
