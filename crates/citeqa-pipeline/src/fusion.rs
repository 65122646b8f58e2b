use std::collections::HashMap;

use citeqa_core::error::{Error, Result};
use citeqa_core::text::LexicalQuery;
use citeqa_core::traits::LexicalIndex;
use citeqa_core::types::{Candidate, ChunkId, RankedResult, ScoredCandidate};

/// Lexical score per candidate, ranked only among `candidates`. Chunks the
/// lexical query does not match score 0.0.
pub fn attach_lexical_scores(lexical: &dyn LexicalIndex, query: &str, candidates: Vec<Candidate>) -> Result<Vec<ScoredCandidate>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let lexical_query = LexicalQuery::from_raw(query);
    let ids: Vec<ChunkId> = candidates.iter().map(|c| c.chunk_id).collect();
    let hits = lexical.rank(&lexical_query, &ids).map_err(Error::capability("lexical index"))?;
    // Index output is a distance; flip it so higher is better.
    let scores: HashMap<ChunkId, f32> = hits.into_iter().map(|h| (h.chunk_id, -h.distance)).collect();
    Ok(candidates
        .into_iter()
        .map(|c| {
            let lexical_score = scores.get(&c.chunk_id).copied().unwrap_or(0.0);
            ScoredCandidate::from_candidate(c, lexical_score)
        })
        .collect())
}

/// Vector score descending, stable.
pub fn baseline_order(mut candidates: Vec<ScoredCandidate>) -> Vec<RankedResult> {
    candidates.sort_by(|a, b| b.vector_score.total_cmp(&a.vector_score));
    candidates.into_iter().map(|c| RankedResult::from_scored(c, None)).collect()
}
