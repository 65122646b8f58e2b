//! Chunk and document store (SQLite) plus text ingestion.

pub mod chunker;
pub mod ingest;
pub mod store;

pub use ingest::{ingest_directory, IngestReport, SourceEntry};
pub use store::SqliteCorpus;
