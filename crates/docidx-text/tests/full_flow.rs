use std::fs;
use std::path::{Path, PathBuf};

use docidx_core::config::LexicalSettings;
use docidx_core::traits::LexicalSearcher;
use docidx_core::types::{DuplicatePolicy, LexicalField};
use docidx_core::Error;
use docidx_text::{LexicalBuilder, TantivyLexicalIndex};
use tempfile::TempDir;

fn write_corpus(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn settings(corpus: &Path, index_dir: &Path) -> LexicalSettings {
    LexicalSettings {
        documents_path: corpus.to_path_buf(),
        index_dir: index_dir.to_path_buf(),
        writer_memory_mb: 16,
        progress_every: 1,
        sanity_query: "finances".to_string(),
        duplicate_ids: DuplicatePolicy::Fail,
    }
}

#[test]
fn title_match_builds_and_is_searchable() {
    let tmp = TempDir::new().unwrap();
    let corpus = write_corpus(tmp.path(), "documents.jsonl", &[
        r#"{"id":"a","title":"Finances","content":"quarterly report"}"#,
        r#"{"id":"","title":"x"}"#,
    ]);
    let index_dir = tmp.path().join("indexes").join("lexical");

    let report = LexicalBuilder::with_paths(&corpus, &index_dir).build().expect("build");
    assert_eq!((report.indexed, report.skipped), (1, 1));
    assert_eq!(report.to_string(), "indexed=1 skipped=1");
    // "finances" is only in the title, so the content-only self-check finds nothing
    assert_eq!(report.sanity.hits, 0);

    let index = TantivyLexicalIndex::open(&index_dir).expect("open");
    assert_eq!(index.num_docs().unwrap(), 1);
    let hits = index.query_fields(&[LexicalField::Title, LexicalField::Content], "finances", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "a");
    let stemmed = index.query(LexicalField::Title, "finance", 10).unwrap();
    assert_eq!(stemmed.len(), 1, "title is analyzed with a stemmer");
    let reports = index.query(LexicalField::Content, "reports", 10).unwrap();
    assert_eq!(reports.len(), 1, "content is analyzed with a stemmer");
}

#[test]
fn sanity_check_reports_first_hit() {
    let tmp = TempDir::new().unwrap();
    let corpus = write_corpus(tmp.path(), "documents.jsonl", &[
        r#"{"id":"x1","title":"Budget","content":"Household finances for the year"}"#,
        r#"{"id":"x2","title":"Garden","post_content":"Tomatoes and beans"}"#,
    ]);
    let index_dir = tmp.path().join("ix");
    let report = LexicalBuilder::new(settings(&corpus, &index_dir)).build().unwrap();
    assert_eq!(report.sanity.hits, 1);
    assert_eq!(report.sanity.example_doc_id.as_deref(), Some("x1"));
}

#[test]
fn rebuild_is_idempotent_and_drops_stale_entries() {
    let tmp = TempDir::new().unwrap();
    let index_dir = tmp.path().join("ix");
    let first = write_corpus(tmp.path(), "first.jsonl", &[
        r#"{"id":"old","title":"Stale entry","content":"should disappear"}"#,
        r#"{"id":"keep","title":"Kept","content":"still here"}"#,
    ]);
    LexicalBuilder::new(settings(&first, &index_dir)).build().unwrap();

    let second = write_corpus(tmp.path(), "second.jsonl", &[
        r#"{"id":"keep","title":"Kept","content":"still here"}"#,
        r#"{"id":"new","description":"fresh description"}"#,
    ]);
    let a = LexicalBuilder::new(settings(&second, &index_dir)).build().unwrap();
    let b = LexicalBuilder::new(settings(&second, &index_dir)).build().unwrap();
    assert_eq!((a.indexed, a.skipped), (b.indexed, b.skipped));

    let index = TantivyLexicalIndex::open(&index_dir).unwrap();
    assert_eq!(index.num_docs().unwrap(), 2);
    let mut ids = index.doc_ids().unwrap();
    ids.sort();
    assert_eq!(ids, vec!["keep", "new"]);
    assert!(index.query(LexicalField::Content, "disappear", 10).unwrap().is_empty());

    let siblings: Vec<_> = fs::read_dir(tmp.path()).unwrap().filter_map(|e| e.ok()).map(|e| e.file_name()).collect();
    assert!(siblings.iter().all(|n| !n.to_string_lossy().starts_with(".ix.")), "no staging leftovers: {siblings:?}");
}

#[test]
fn malformed_corpus_keeps_previous_index() {
    let tmp = TempDir::new().unwrap();
    let index_dir = tmp.path().join("ix");
    let good = write_corpus(tmp.path(), "good.jsonl", &[r#"{"id":"a","content":"alpha"}"#]);
    LexicalBuilder::new(settings(&good, &index_dir)).build().unwrap();

    let bad = write_corpus(tmp.path(), "bad.jsonl", &[r#"{"id":"b","content":"beta"}"#, "not json at all"]);
    let err = LexicalBuilder::new(settings(&bad, &index_dir)).build().unwrap_err();
    match err.downcast_ref::<Error>() {
        Some(Error::MalformedRecord { line, path, .. }) => {
            assert_eq!(*line, 2);
            assert_eq!(path, &bad);
        }
        other => panic!("unexpected {other:?}"),
    }

    let index = TantivyLexicalIndex::open(&index_dir).unwrap();
    assert_eq!(index.doc_ids().unwrap(), vec!["a"]);
}

#[test]
fn duplicate_policies_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let corpus = write_corpus(tmp.path(), "dups.jsonl", &[
        r#"{"id":"a","title":"first copy"}"#,
        r#"{"id":"a","title":"second copy"}"#,
    ]);

    let fail_dir = tmp.path().join("fail_ix");
    let err = LexicalBuilder::new(settings(&corpus, &fail_dir)).build().unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DuplicateId { .. })));
    assert!(!fail_dir.exists(), "a failed first build leaves no index behind");

    let wins_dir = tmp.path().join("wins_ix");
    let mut s = settings(&corpus, &wins_dir);
    s.duplicate_ids = DuplicatePolicy::FirstWins;
    let report = LexicalBuilder::new(s).build().unwrap();
    assert_eq!((report.indexed, report.skipped), (1, 1));
    let index = TantivyLexicalIndex::open(&wins_dir).unwrap();
    assert_eq!(index.distinct_doc_ids().unwrap(), 1);
    assert_eq!(index.query(LexicalField::Title, "first", 5).unwrap().len(), 1);
    assert!(index.query(LexicalField::Title, "second", 5).unwrap().is_empty());
}

#[test]
fn foreign_destination_is_not_deleted() {
    let tmp = TempDir::new().unwrap();
    let corpus = write_corpus(tmp.path(), "c.jsonl", &[r#"{"id":"a","content":"alpha"}"#]);
    let dest = tmp.path().join("occupied");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("precious.txt"), "do not delete").unwrap();

    let err = LexicalBuilder::new(settings(&corpus, &dest)).build().unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DestinationOccupied { .. })));
    assert!(dest.join("precious.txt").exists());
}

#[test]
fn missing_corpus_is_fatal_before_touching_destination() {
    let tmp = TempDir::new().unwrap();
    let dest = tmp.path().join("ix");
    let err = LexicalBuilder::new(settings(&tmp.path().join("absent.jsonl"), &dest)).build().unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Io { .. })));
    assert!(!dest.exists());
}

#[test]
fn oversized_writer_memory_still_builds() {
    let tmp = TempDir::new().unwrap();
    let corpus = write_corpus(tmp.path(), "c.jsonl", &[r#"{"id":"a","content":"alpha"}"#]);
    let index_dir = tmp.path().join("ix");
    let mut s = settings(&corpus, &index_dir);
    s.writer_memory_mb = 8192;
    let report = LexicalBuilder::new(s).build().expect("budget above the per-thread maximum is clamped");
    assert_eq!(report.indexed, 1);
    assert_eq!(TantivyLexicalIndex::open(&index_dir).unwrap().num_docs().unwrap(), 1);
}

#[test]
fn unwritable_destination_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let corpus = write_corpus(tmp.path(), "c.jsonl", &[r#"{"id":"a","content":"alpha"}"#]);
    let blocker = tmp.path().join("blocker");
    fs::write(&blocker, "a regular file").unwrap();
    let dest = blocker.join("ix");

    let err = LexicalBuilder::new(settings(&corpus, &dest)).build().unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Io { .. })), "unexpected {err:?}");
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "a regular file");
    let mut names: Vec<String> = fs::read_dir(tmp.path()).unwrap().filter_map(|e| e.ok()).map(|e| e.file_name().to_string_lossy().into_owned()).collect();
    names.sort();
    assert_eq!(names, vec!["blocker", "c.jsonl"], "nothing else is created");
}
