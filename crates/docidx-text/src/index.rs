use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tantivy::collector::{DocSetCollector, TopDocs};
use tantivy::query::{AllQuery, QueryParser};
use tantivy::schema::Value;
use tantivy::{doc, Index, IndexWriter, TantivyDocument};

use docidx_core::traits::{LexicalSearcher, LexicalWriter};
use docidx_core::types::{DocumentRecord, LexicalField, SearchHit, SourceKind};

use crate::schema::{build_schema, register_tokenizer, LexicalFields};

/// Smallest per-thread budget tantivy accepts.
const MIN_WRITER_BUDGET_BYTES: usize = 15_000_000;
/// Largest per-thread budget tantivy accepts (`u32::MAX` less its 1 MB margin).
pub const MAX_WRITER_BUDGET_BYTES: usize = 4_293_967_295;

/// Per-thread writer budget for `memory_mb`, clamped to what tantivy accepts.
pub fn writer_budget_bytes(memory_mb: usize) -> usize {
	memory_mb.saturating_mul(1_000_000).clamp(MIN_WRITER_BUDGET_BYTES, MAX_WRITER_BUDGET_BYTES)
}

pub struct TantivyLexicalIndex {
	index: Index,
	fields: LexicalFields,
}

impl TantivyLexicalIndex {
	/// Whether `dir` holds a committed lexical index.
	pub fn exists(dir: &Path) -> bool {
		dir.join("meta.json").is_file()
	}

	/// Creates an empty index with the fixed schema. `dir` must exist and be empty.
	pub fn create(dir: &Path) -> Result<Self> {
		let index = Index::create_in_dir(dir, build_schema()).with_context(|| format!("creating lexical index in {}", dir.display()))?;
		register_tokenizer(&index);
		let fields = LexicalFields::from_schema(&index.schema())?;
		Ok(Self { index, fields })
	}

	pub fn open(dir: &Path) -> Result<Self> {
		let index = Index::open_in_dir(dir).with_context(|| format!("opening lexical index in {}", dir.display()))?;
		register_tokenizer(&index);
		let fields = LexicalFields::from_schema(&index.schema())?;
		Ok(Self { index, fields })
	}

	/// A single-threaded writer with roughly `memory_mb` of buffer.
	pub fn writer(&self, memory_mb: usize) -> Result<TantivyLexicalWriter> {
		let budget = writer_budget_bytes(memory_mb);
		if budget != memory_mb.saturating_mul(1_000_000) {
			tracing::debug!(memory_mb, budget, "writer budget clamped to engine limits");
		}
		let writer: IndexWriter = self.index.writer_with_num_threads(1, budget)?;
		Ok(TantivyLexicalWriter { writer, fields: self.fields, pending: 0 })
	}

	/// Ranked hits for `text` parsed against any of `fields`.
	pub fn query_fields(&self, fields: &[LexicalField], text: &str, limit: usize) -> Result<Vec<SearchHit>> {
		if limit == 0 {
			return Ok(Vec::new());
		}
		let searcher = self.index.reader()?.searcher();
		let parser = QueryParser::for_index(&self.index, fields.iter().map(|f| self.fields.field(*f)).collect());
		let (query, errors) = parser.parse_query_lenient(text);
		if !errors.is_empty() {
			tracing::debug!(query = text, errors = errors.len(), "lenient query parse dropped clauses");
		}
		let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let id = doc.get_first(self.fields.doc_id).and_then(|v| v.as_str()).unwrap_or("").to_string();
			hits.push(SearchHit { id, score, source: SourceKind::Text });
		}
		Ok(hits)
	}

	/// Every stored `doc_id`, in no particular order.
	pub fn doc_ids(&self) -> Result<Vec<String>> {
		let searcher = self.index.reader()?.searcher();
		let addrs = searcher.search(&AllQuery, &DocSetCollector)?;
		let mut ids = Vec::with_capacity(addrs.len());
		for addr in addrs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			if let Some(id) = doc.get_first(self.fields.doc_id).and_then(|v| v.as_str()) {
				ids.push(id.to_string());
			}
		}
		Ok(ids)
	}

	/// Number of distinct stored ids; equals `num_docs` when ids are unique.
	pub fn distinct_doc_ids(&self) -> Result<usize> {
		Ok(self.doc_ids()?.into_iter().collect::<HashSet<_>>().len())
	}
}

impl LexicalSearcher for TantivyLexicalIndex {
	fn query(&self, field: LexicalField, text: &str, limit: usize) -> Result<Vec<SearchHit>> {
		self.query_fields(&[field], text, limit)
	}

	fn num_docs(&self) -> Result<u64> {
		Ok(self.index.reader()?.searcher().num_docs())
	}
}

pub struct TantivyLexicalWriter {
	writer: IndexWriter,
	fields: LexicalFields,
	pending: u64,
}

impl TantivyLexicalWriter {
	/// Waits for background merges so the directory can be moved safely.
	pub fn finish(self) -> Result<()> {
		self.writer.wait_merging_threads()?;
		Ok(())
	}
}

impl LexicalWriter for TantivyLexicalWriter {
	fn add_entry(&mut self, record: &DocumentRecord) -> Result<()> {
		self.writer.add_document(doc!(
			self.fields.doc_id => record.id.clone(),
			self.fields.title => record.title.clone(),
			self.fields.content => record.content.clone(),
		))?;
		self.pending += 1;
		Ok(())
	}

	fn commit(&mut self) -> Result<u64> {
		self.writer.commit()?;
		Ok(std::mem::take(&mut self.pending))
	}
}
