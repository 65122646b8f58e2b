//! citeqa-text
//!
//! Tantivy-backed lexical index over corpus chunks. Ranking is always
//! restricted to a caller-supplied chunk id set and reported as a BM25
//! distance (lower is better).

pub mod tantivy_utils;
pub mod index;

pub use index::TantivyLexicalIndex;
