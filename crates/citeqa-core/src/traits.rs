//! Capabilities the pipeline is built from. Implementations are shared
//! read-only across concurrent requests, hence `Send + Sync`.

use std::collections::HashMap;

use crate::text::LexicalQuery;
use crate::types::{ChunkId, DocMeta, LexicalHit, VectorHit};

/// Text → L2-normalized vector. Index build and query time must use the same
/// implementation.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Joint (query, passage) relevance model. One score per text, same order.
pub trait PairScorer: Send + Sync {
    fn score_pairs(&self, query: &str, texts: &[&str]) -> anyhow::Result<Vec<f32>>;
}

/// Nearest-neighbor search over normalized vectors. Scores are cosine
/// similarities, results ordered best first.
pub trait VectorIndex: Send + Sync {
    fn len(&self) -> usize;
    fn search(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<VectorHit>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ranking restricted to `restrict_to`. Chunks without any term match are
/// simply absent from the output.
pub trait LexicalIndex: Send + Sync {
    fn rank(&self, query: &LexicalQuery, restrict_to: &[ChunkId]) -> anyhow::Result<Vec<LexicalHit>>;
}

/// Read side of the corpus. Unknown ids are absent from the returned maps.
pub trait CorpusStore: Send + Sync {
    fn chunk_texts(&self, ids: &[ChunkId]) -> anyhow::Result<HashMap<ChunkId, String>>;
    fn doc_meta(&self, ids: &[ChunkId]) -> anyhow::Result<HashMap<ChunkId, DocMeta>>;
}
