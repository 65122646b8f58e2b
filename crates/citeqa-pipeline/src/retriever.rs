use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use citeqa_core::error::{Error, Result};
use citeqa_core::mapping::IdMapping;
use citeqa_core::traits::{CorpusStore, Embedder, VectorIndex};
use citeqa_core::types::{Candidate, ChunkId};

/// Vector search joined with stored chunk text.
pub struct CandidateRetriever {
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) index: Arc<dyn VectorIndex>,
    pub(crate) mapping: Arc<IdMapping>,
    pub(crate) corpus: Arc<dyn CorpusStore>,
}

impl CandidateRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, mapping: Arc<IdMapping>, corpus: Arc<dyn CorpusStore>) -> Self {
        Self { embedder, index, mapping, corpus }
    }

    /// Up to `top_k` candidates, best vector score first. Positions outside
    /// the mapping and ids without a text row are dropped; a chunk reported
    /// more than once keeps its best score.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Candidate>> {
        if top_k == 0 {
            return Err(Error::InvalidInput("top_k must be at least 1".into()));
        }
        let query_vec = self.embedder.embed(query).map_err(Error::capability("embedder"))?;
        let mut hits = self.index.search(&query_vec, top_k).map_err(Error::capability("vector index"))?;
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut seen = HashSet::with_capacity(hits.len());
        let mut ranked: Vec<(ChunkId, f32)> = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(chunk_id) = self.mapping.chunk_id(hit.position) else {
                warn!(position = hit.position, mapped = self.mapping.len(), "vector hit outside id mapping");
                continue;
            };
            if seen.insert(chunk_id) {
                ranked.push((chunk_id, hit.score));
            }
        }

        let ids: Vec<ChunkId> = ranked.iter().map(|(id, _)| *id).collect();
        let mut texts = self.corpus.chunk_texts(&ids).map_err(Error::capability("corpus store"))?;
        let candidates: Vec<Candidate> = ranked
            .into_iter()
            .filter_map(|(chunk_id, vector_score)| match texts.remove(&chunk_id) {
                Some(text) => Some(Candidate { chunk_id, vector_score, text }),
                None => {
                    debug!(chunk_id, "indexed chunk has no corpus row");
                    None
                }
            })
            .take(top_k)
            .collect();
        Ok(candidates)
    }
}
