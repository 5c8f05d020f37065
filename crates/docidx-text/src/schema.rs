use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

use docidx_core::types::{LexicalField, CONTENT_FIELD, DOC_ID_FIELD, TITLE_FIELD};
use docidx_core::Error;

/// Analyzer name stored in the schema for `title` and `content`.
pub const STEMMING_TOKENIZER: &str = "en_stem_stopwords";

const STOP_WORDS: &[&str] = &[
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
];

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field(DOC_ID_FIELD, STRING | STORED);
	let indexing = TextFieldIndexing::default().set_tokenizer(STEMMING_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(indexing).set_stored();
	schema_builder.add_text_field(TITLE_FIELD, text_options.clone());
	schema_builder.add_text_field(CONTENT_FIELD, text_options);
	schema_builder.build()
}

/// Must run on every `Index` handle, at creation and at open: tantivy does
/// not persist analyzers.
pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(40))
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
		.filter(Stemmer::new(Language::English))
		.build();
	index.tokenizers().register(STEMMING_TOKENIZER, tokenizer);
}

/// Resolved handles of the three contract fields.
#[derive(Debug, Clone, Copy)]
pub struct LexicalFields {
	pub doc_id: Field,
	pub title: Field,
	pub content: Field,
}

impl LexicalFields {
	pub fn from_schema(schema: &Schema) -> Result<Self, Error> {
		let get = |name: &str| schema.get_field(name).map_err(|_| Error::SchemaMismatch(format!("lexical index has no '{}' field", name)));
		Ok(Self { doc_id: get(DOC_ID_FIELD)?, title: get(TITLE_FIELD)?, content: get(CONTENT_FIELD)? })
	}

	pub fn field(&self, field: LexicalField) -> Field {
		match field {
			LexicalField::DocId => self.doc_id,
			LexicalField::Title => self.title,
			LexicalField::Content => self.content,
		}
	}
}
