//! SQLite-backed corpus: `docs` and `chunks` tables joined on `doc_id`.

use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, Connection, OpenFlags};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use citeqa_core::traits::CorpusStore;
use citeqa_core::types::{Chunk, ChunkId, DocId, DocMeta, Document};

/// SQLite caps bound parameters per statement; id lookups are split below it.
const MAX_IDS_PER_QUERY: usize = 500;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS docs (
        doc_id   INTEGER PRIMARY KEY,
        filename TEXT NOT NULL,
        title    TEXT NOT NULL,
        url      TEXT NOT NULL DEFAULT ''
    );
    CREATE TABLE IF NOT EXISTS chunks (
        chunk_id     INTEGER PRIMARY KEY,
        doc_id       INTEGER NOT NULL REFERENCES docs(doc_id),
        chunk_text   TEXT NOT NULL,
        content_hash TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_chunks_doc ON chunks(doc_id);
";

pub struct SqliteCorpus {
    conn: Mutex<Connection>,
}

impl SqliteCorpus {
    /// Open (creating if needed) for ingestion.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).with_context(|| format!("Failed to open corpus {}", path.display()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Serving handle; the file must already exist.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .with_context(|| format!("Failed to open corpus {} read-only", path.display()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow::anyhow!("corpus lock poisoned: {e}"))
    }

    /// Drop and recreate both tables. Ids restart at 1.
    pub fn reset(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DROP TABLE IF EXISTS chunks; DROP TABLE IF EXISTS docs;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn insert_document(&self, filename: &str, title: &str, url: &str) -> Result<DocId> {
        let conn = self.lock()?;
        conn.execute("INSERT INTO docs (filename, title, url) VALUES (?1, ?2, ?3)", params![filename, title, url])?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert chunk texts for `doc_id` in one transaction, in order.
    pub fn insert_chunks(&self, doc_id: DocId, texts: &[String]) -> Result<Vec<Chunk>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut out = Vec::with_capacity(texts.len());
        {
            let mut stmt = tx.prepare("INSERT INTO chunks (doc_id, chunk_text, content_hash) VALUES (?1, ?2, ?3)")?;
            for text in texts {
                let content_hash = blake3::hash(text.as_bytes()).to_hex().to_string();
                stmt.execute(params![doc_id, text, content_hash])?;
                out.push(Chunk { chunk_id: tx.last_insert_rowid(), doc_id, text: text.clone(), content_hash });
            }
        }
        tx.commit()?;
        Ok(out)
    }

    /// Every chunk, ascending by id.
    pub fn all_chunks(&self) -> Result<Vec<Chunk>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT chunk_id, doc_id, chunk_text, content_hash FROM chunks ORDER BY chunk_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Chunk { chunk_id: row.get(0)?, doc_id: row.get(1)?, text: row.get(2)?, content_hash: row.get(3)? })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn documents(&self) -> Result<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT doc_id, filename, title, url FROM docs ORDER BY doc_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Document { doc_id: row.get(0)?, filename: row.get(1)?, title: row.get(2)?, url: row.get(3)? })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(usize::try_from(n)?)
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

impl CorpusStore for SqliteCorpus {
    fn chunk_texts(&self, ids: &[ChunkId]) -> Result<HashMap<ChunkId, String>> {
        let conn = self.lock()?;
        let mut out = HashMap::with_capacity(ids.len());
        for batch in ids.chunks(MAX_IDS_PER_QUERY) {
            let sql = format!("SELECT chunk_id, chunk_text FROM chunks WHERE chunk_id IN ({})", placeholders(batch.len()));
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(batch.iter()), |row| Ok((row.get::<_, ChunkId>(0)?, row.get::<_, String>(1)?)))?;
            for row in rows {
                let (id, text) = row?;
                out.insert(id, text);
            }
        }
        debug!(requested = ids.len(), found = out.len(), "chunk text lookup");
        Ok(out)
    }

    fn doc_meta(&self, ids: &[ChunkId]) -> Result<HashMap<ChunkId, DocMeta>> {
        let conn = self.lock()?;
        let mut out = HashMap::with_capacity(ids.len());
        for batch in ids.chunks(MAX_IDS_PER_QUERY) {
            let sql = format!(
                "SELECT c.chunk_id, d.doc_id, d.title, d.url FROM chunks c JOIN docs d ON d.doc_id = c.doc_id WHERE c.chunk_id IN ({})",
                placeholders(batch.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(batch.iter()), |row| {
                Ok((row.get::<_, ChunkId>(0)?, DocMeta { doc_id: row.get(1)?, title: row.get(2)?, url: row.get(3)? }))
            })?;
            for row in rows {
                let (id, meta) = row?;
                out.insert(id, meta);
            }
        }
        Ok(out)
    }
}
