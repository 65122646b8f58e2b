use anyhow::{Context, Result};
use std::path::Path;
use tantivy::{doc, Index, IndexReader, ReloadPolicy, TantivyDocument, Term};
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, EmptyQuery, Occur, Query, TermQuery, TermSetQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::tokenizer::TokenStream;
use tracing::{debug, info};

use citeqa_core::text::LexicalQuery;
use citeqa_core::traits::LexicalIndex;
use citeqa_core::types::{Chunk, ChunkId, LexicalHit};

use crate::tantivy_utils::{build_schema, register_tokenizer, CHUNK_ID_FIELD, TEXT_FIELD};

pub struct TantivyLexicalIndex {
	index: Index,
	reader: IndexReader,
	chunk_id_field: Field,
	text_field: Field,
}

impl TantivyLexicalIndex {
	/// Recreate an empty index at `index_dir` (deletes existing contents).
	pub fn create(index_dir: &Path) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		let index = Index::create_in_dir(index_dir, build_schema())?;
		Self::from_index(index)
	}

	pub fn create_in_ram() -> Result<Self> {
		Self::from_index(Index::create_in_ram(build_schema()))
	}

	pub fn open(index_dir: &Path) -> Result<Self> {
		let index = Index::open_in_dir(index_dir)
			.with_context(|| format!("Failed to open lexical index at {}", index_dir.display()))?;
		Self::from_index(index)
	}

	fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let schema = index.schema();
		let chunk_id_field = schema.get_field(CHUNK_ID_FIELD)?;
		let text_field = schema.get_field(TEXT_FIELD)?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		Ok(Self { index, reader, chunk_id_field, text_field })
	}

	pub fn index_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
		let mut index_writer = self.index.writer(50_000_000)?;
		for c in chunks {
			index_writer.add_document(doc!(
				self.chunk_id_field => c.chunk_id,
				self.text_field => c.text.clone(),
			))?;
		}
		index_writer.commit()?;
		self.reader.reload()?;
		info!(chunks = chunks.len(), "lexical index committed");
		Ok(chunks.len())
	}

	pub fn num_docs(&self) -> u64 {
		self.reader.searcher().num_docs()
	}

	/// Disjunction of `TermQuery`s over the analyzed tokens. Tokens the
	/// analyzer drops (stop words) contribute nothing; if none remain the
	/// query matches nothing.
	fn text_query(&self, query: &LexicalQuery) -> Result<Box<dyn Query>> {
		let LexicalQuery::AnyOf(tokens) = query else { return Ok(Box::new(EmptyQuery)) };
		let mut analyzer = self.index.tokenizer_for_field(self.text_field)?;
		let mut terms = Vec::new();
		for token in tokens {
			let mut stream = analyzer.token_stream(token);
			while stream.advance() {
				let term = Term::from_field_text(self.text_field, &stream.token().text);
				if !terms.contains(&term) { terms.push(term); }
			}
		}
		if terms.is_empty() { return Ok(Box::new(EmptyQuery)); }
		let clauses: Vec<(Occur, Box<dyn Query>)> = terms
			.into_iter()
			.map(|t| (Occur::Should, Box::new(TermQuery::new(t, IndexRecordOption::WithFreqs)) as Box<dyn Query>))
			.collect();
		Ok(Box::new(BooleanQuery::new(clauses)))
	}
}

impl LexicalIndex for TantivyLexicalIndex {
	fn rank(&self, query: &LexicalQuery, restrict_to: &[ChunkId]) -> anyhow::Result<Vec<LexicalHit>> {
		if restrict_to.is_empty() { return Ok(Vec::new()); }
		let text_query = self.text_query(query)?;
		// Zero boost: the id filter must not shift BM25 scores.
		let restriction = TermSetQuery::new(restrict_to.iter().map(|id| Term::from_field_i64(self.chunk_id_field, *id)));
		let restricted = BooleanQuery::new(vec![
			(Occur::Must, text_query),
			(Occur::Must, Box::new(BoostQuery::new(Box::new(restriction), 0.0))),
		]);
		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&restricted, &TopDocs::with_limit(restrict_to.len()))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let chunk_id = doc
				.get_first(self.chunk_id_field)
				.and_then(|v| v.as_i64())
				.ok_or_else(|| anyhow::anyhow!("lexical document without chunk_id"))?;
			hits.push(LexicalHit { chunk_id, distance: -score });
		}
		debug!(query = %query, restricted = restrict_to.len(), hits = hits.len(), "lexical rank");
		Ok(hits)
	}
}
