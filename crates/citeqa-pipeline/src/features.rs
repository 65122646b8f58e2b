//! Export of `(question, chunk)` feature rows for reranker training.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use citeqa_core::text::LexicalQuery;
use citeqa_core::traits::{CorpusStore, Embedder, LexicalIndex, VectorIndex};
use citeqa_core::types::ChunkId;
use citeqa_rerank::TrainingRow;
use citeqa_vector::FlatIndex;

use crate::pipeline::QaPipeline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledQuestion {
    pub q: String,
    #[serde(default)]
    pub positives: Vec<ChunkId>,
    #[serde(default)]
    pub negatives: Vec<ChunkId>,
}

impl LabeledQuestion {
    fn label(&self, chunk_id: ChunkId) -> Option<u8> {
        if self.positives.contains(&chunk_id) {
            Some(1)
        } else if self.negatives.contains(&chunk_id) {
            Some(0)
        } else {
            None
        }
    }
}

/// Feature rows for the top `top_k` fused candidates of each question, plus
/// any labeled chunk retrieval missed, scored directly against the query.
pub fn export_features(pipeline: &QaPipeline, questions: &[LabeledQuestion], top_k: usize) -> Result<Vec<TrainingRow>> {
    let mut rows = Vec::new();
    for (i, question) in questions.iter().enumerate() {
        let candidates = pipeline.fused_candidates(&question.q, top_k)?;
        let seen: HashSet<ChunkId> = candidates.iter().map(|c| c.chunk_id).collect();
        for c in &candidates {
            rows.push(TrainingRow {
                q: question.q.clone(),
                chunk_id: c.chunk_id,
                vector_score: c.vector_score,
                lexical_score: c.lexical_score,
                label: question.label(c.chunk_id),
            });
        }

        let mut wanted = HashSet::new();
        let missing: Vec<ChunkId> = question
            .positives
            .iter()
            .chain(&question.negatives)
            .copied()
            .filter(|id| !seen.contains(id) && wanted.insert(*id))
            .collect();
        if !missing.is_empty() {
            rows.extend(score_missing(pipeline, question, &missing)?);
        }
        info!(n = i + 1, total = questions.len(), candidates = candidates.len(), added = missing.len(), "features exported");
    }
    Ok(rows)
}

fn score_missing(pipeline: &QaPipeline, question: &LabeledQuestion, missing: &[ChunkId]) -> Result<Vec<TrainingRow>> {
    let retriever = &pipeline.retriever;
    let texts = retriever.corpus.chunk_texts(missing)?;
    let present: Vec<ChunkId> = missing.iter().copied().filter(|id| texts.contains_key(id)).collect();
    for id in missing.iter().filter(|id| !texts.contains_key(id)) {
        warn!(chunk_id = id, q = %question.q, "labeled chunk not in corpus");
    }
    if present.is_empty() {
        return Ok(Vec::new());
    }
    let query_vec = retriever.embedder.embed(&question.q)?;
    let chunk_texts: Vec<String> = present.iter().filter_map(|id| texts.get(id).cloned()).collect();
    // Exact scores over just the labeled chunks; position i is present[i].
    let flat = FlatIndex::from_vectors(retriever.embedder.dim(), retriever.embedder.embed_batch(&chunk_texts)?)?;
    let vector: HashMap<ChunkId, f32> = flat
        .search(&query_vec, present.len())?
        .into_iter()
        .filter_map(|h| present.get(h.position).map(|id| (*id, h.score)))
        .collect();
    let lexical: HashMap<ChunkId, f32> = pipeline
        .lexical
        .rank(&LexicalQuery::from_raw(&question.q), &present)?
        .into_iter()
        .map(|h| (h.chunk_id, -h.distance))
        .collect();
    Ok(present
        .iter()
        .map(|id| TrainingRow {
            q: question.q.clone(),
            chunk_id: *id,
            vector_score: vector.get(id).copied().unwrap_or(0.0),
            lexical_score: lexical.get(id).copied().unwrap_or(0.0),
            label: question.label(*id),
        })
        .collect())
}
