//! Domain types shared by the retrieval, reranking and answering crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Corpus chunk identity. Also the join key for both indexes.
pub type ChunkId = i64;
pub type DocId = i64;

/// An ingested source document. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: DocId,
    pub filename: String,
    pub title: String,
    pub url: String,
}

/// A bounded span of document text, the unit of retrieval.
///
/// - `chunk_id`: globally unique, stable across the vector index, the lexical
///   index and the corpus store
/// - `doc_id`: owning document
/// - `content_hash`: hex BLAKE3 digest of `text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub doc_id: DocId,
    pub text: String,
    pub content_hash: String,
}

/// Citation metadata of the document owning a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub doc_id: DocId,
    pub title: String,
    pub url: String,
}

/// Raw hit from the vector index. `position` is index-internal and must be
/// translated through an [`crate::mapping::IdMapping`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorHit {
    pub position: usize,
    pub score: f32,
}

/// Raw hit from the lexical index. `distance` is lower-is-better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalHit {
    pub chunk_id: ChunkId,
    pub distance: f32,
}

/// A chunk surfaced by vector search for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub chunk_id: ChunkId,
    pub vector_score: f32,
    pub text: String,
}

/// Candidate plus its lexical score (higher is better).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub chunk_id: ChunkId,
    pub vector_score: f32,
    pub lexical_score: f32,
    pub text: String,
}

impl ScoredCandidate {
    pub fn from_candidate(c: Candidate, lexical_score: f32) -> Self {
        Self { chunk_id: c.chunk_id, vector_score: c.vector_score, lexical_score, text: c.text }
    }

    /// Feature vector consumed by the learned reranker.
    pub fn features(&self) -> [f32; 2] {
        [self.vector_score, self.lexical_score]
    }
}

/// A context returned to the caller.
///
/// `rerank_score` is absent in baseline mode. `text` is the display text
/// (truncated) once the result leaves the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub chunk_id: ChunkId,
    pub vector_score: f32,
    pub lexical_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub text: String,
}

impl RankedResult {
    pub fn from_scored(c: ScoredCandidate, rerank_score: Option<f32>) -> Self {
        Self {
            chunk_id: c.chunk_id,
            vector_score: c.vector_score,
            lexical_score: c.lexical_score,
            rerank_score,
            title: None,
            url: None,
            text: c.text,
        }
    }

    /// Score the abstention gate looks at for `mode`.
    pub fn confidence(&self, mode: Mode) -> f32 {
        match mode {
            Mode::Baseline => self.vector_score,
            Mode::Rerank => self.rerank_score.unwrap_or(0.0),
        }
    }
}

/// Ordering/gating mode of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Baseline,
    #[default]
    Rerank,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Baseline => "baseline",
            Mode::Rerank => "rerank",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" => Ok(Mode::Baseline),
            "rerank" => Ok(Mode::Rerank),
            other => Err(Error::InvalidInput(format!("unknown mode '{other}' (expected baseline|rerank)"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: Option<String>,
    pub url: Option<String>,
    pub chunk_id: ChunkId,
}

/// Extractive answer: original sentences plus where they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub snippet: String,
    pub citation: Citation,
}

/// Why no answer was produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbstainReason {
    NoContexts,
    LowConfidence { mode: Mode, score: f32 },
}

impl fmt::Display for AbstainReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbstainReason::NoContexts => f.write_str("no_contexts"),
            AbstainReason::LowConfidence { mode, score } => write!(f, "low_confidence_{mode}:{score:.3}"),
        }
    }
}

fn default_k() -> usize {
    5
}

/// Service request shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub mode: Mode,
}

impl AskRequest {
    pub fn new(q: impl Into<String>, k: usize, mode: Mode) -> Self {
        Self { q: q.into(), k, mode }
    }

    /// Rejects requests that must never reach the pipeline.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.q.trim().is_empty() {
            return Err(Error::InvalidInput("missing q".to_string()));
        }
        if self.k == 0 {
            return Err(Error::InvalidInput("k must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Service response shape. `abstain_reason` is present iff `answer` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: Option<Answer>,
    pub contexts: Vec<RankedResult>,
    pub reranker_used: bool,
    pub abstain_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abstain_reason_formats_three_decimals() {
        let r = AbstainReason::LowConfidence { mode: Mode::Baseline, score: 0.25 };
        assert_eq!(r.to_string(), "low_confidence_baseline:0.250");
        assert_eq!(AbstainReason::NoContexts.to_string(), "no_contexts");
    }

    #[test]
    fn request_defaults_follow_service_contract() {
        let req: AskRequest = serde_json::from_str(r#"{"q":"gloves"}"#).unwrap();
        assert_eq!(req.k, 5);
        assert_eq!(req.mode, Mode::Rerank);
        assert!(req.validate().is_ok());

        let empty: AskRequest = serde_json::from_str(r#"{"q":"   ","mode":"baseline"}"#).unwrap();
        assert_eq!(empty.mode, Mode::Baseline);
        assert!(matches!(empty.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Baseline".parse::<Mode>().unwrap(), Mode::Baseline);
        assert_eq!(" rerank ".parse::<Mode>().unwrap(), Mode::Rerank);
        assert!("hybrid".parse::<Mode>().is_err());
    }

    #[test]
    fn missing_rerank_score_counts_as_zero() {
        let c = ScoredCandidate { chunk_id: 1, vector_score: 0.8, lexical_score: 2.0, text: "t".into() };
        let r = RankedResult::from_scored(c, None);
        assert_eq!(r.confidence(Mode::Rerank), 0.0);
        assert!((r.confidence(Mode::Baseline) - 0.8).abs() < 1e-6);
    }
}
