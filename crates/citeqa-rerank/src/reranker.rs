//! The two reranking strategies behind one closed type.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use citeqa_core::traits::PairScorer;
use citeqa_core::types::{RankedResult, ScoredCandidate};

use crate::model::LogisticModel;

pub enum Reranker {
    /// Logistic model over `[vector_score, lexical_score]`.
    Linear(LogisticModel),
    /// Joint (query, passage) relevance model.
    CrossEncoder(Arc<dyn PairScorer>),
}

impl Reranker {
    /// A readable artifact at `artifact_path` selects [`Reranker::Linear`];
    /// no artifact selects the cross-encoder built by `load_scorer`. An
    /// artifact that exists but does not load is an error.
    pub fn select<F>(artifact_path: &Path, load_scorer: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Arc<dyn PairScorer>>,
    {
        if artifact_path.exists() {
            let model = LogisticModel::load(artifact_path)?;
            info!(artifact = %artifact_path.display(), "reranker: learned linear");
            return Ok(Reranker::Linear(model));
        }
        info!(artifact = %artifact_path.display(), "no trained artifact, reranker: cross-encoder");
        Ok(Reranker::CrossEncoder(load_scorer()?))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Reranker::Linear(_) => "linear",
            Reranker::CrossEncoder(_) => "cross_encoder",
        }
    }

    /// Scores every candidate and orders by `rerank_score` descending; ties
    /// keep incoming order. Any scoring failure fails the whole call.
    pub fn rerank(&self, query: &str, candidates: Vec<ScoredCandidate>) -> Result<Vec<RankedResult>> {
        if candidates.is_empty() { return Ok(Vec::new()); }
        let scores = match self {
            Reranker::Linear(model) => candidates.iter().map(|c| model.predict_proba(c.features())).collect(),
            Reranker::CrossEncoder(scorer) => {
                let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
                let scores = scorer.score_pairs(query, &texts)?;
                anyhow::ensure!(scores.len() == candidates.len(), "pair scorer returned {} scores for {} candidates", scores.len(), candidates.len());
                scores
            }
        };
        let mut scored: Vec<(ScoredCandidate, f32)> = candidates.into_iter().zip(scores).collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        let ranked: Vec<RankedResult> = scored.into_iter().map(|(c, s)| RankedResult::from_scored(c, Some(s))).collect();
        debug!(reranker = self.name(), n = ranked.len(), "reranked");
        Ok(ranked)
    }
}
