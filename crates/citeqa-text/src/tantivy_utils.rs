use tantivy::schema::{Schema, TextFieldIndexing, TextOptions, IndexRecordOption, NumericOptions};
use tantivy::tokenizer::{TextAnalyzer, SimpleTokenizer, LowerCaser, StopWordFilter};
use tantivy::Index;

pub const CHUNK_ID_FIELD: &str = "chunk_id";
pub const TEXT_FIELD: &str = "text";
pub const TOKENIZER_NAME: &str = "chunk_text";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	let chunk_id_options = NumericOptions::default().set_indexed().set_stored().set_fast();
	let _chunk_id_field = schema_builder.add_i64_field(CHUNK_ID_FIELD, chunk_id_options);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
	let _text_field = schema_builder.add_text_field(TEXT_FIELD, text_options);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","shall","do","does","did","have","had","having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
