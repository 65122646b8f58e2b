use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use citeqa_core::config::Settings;
use citeqa_core::error::Error;
use citeqa_core::mapping::IdMapping;
use citeqa_core::text::LexicalQuery;
use citeqa_core::traits::{CorpusStore, Embedder, LexicalIndex, PairScorer, VectorIndex};
use citeqa_core::types::{ChunkId, DocMeta, LexicalHit, Mode, VectorHit};
use citeqa_pipeline::{Capabilities, QaPipeline};
use citeqa_rerank::{LogisticModel, Reranker};

const SAFETY: &str = "Operators must wear gloves. Eye protection is mandatory. Report incidents promptly.";

struct StubEmbedder;
impl Embedder for StubEmbedder {
    fn dim(&self) -> usize { 2 }
    fn max_len(&self) -> usize { 16 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Returns canned hits and records the requested k.
struct StubVectors { hits: Vec<VectorHit>, requested: Mutex<Vec<usize>> }
impl VectorIndex for StubVectors {
    fn len(&self) -> usize { self.hits.len() }
    fn search(&self, _q: &[f32], k: usize) -> anyhow::Result<Vec<VectorHit>> {
        self.requested.lock().unwrap().push(k);
        Ok(self.hits.iter().copied().take(k).collect())
    }
}

struct StubLexical { distances: HashMap<ChunkId, f32>, fail: bool, queries: Mutex<Vec<LexicalQuery>> }
impl LexicalIndex for StubLexical {
    fn rank(&self, query: &LexicalQuery, restrict_to: &[ChunkId]) -> anyhow::Result<Vec<LexicalHit>> {
        if self.fail { anyhow::bail!("index corrupted"); }
        self.queries.lock().unwrap().push(query.clone());
        if *query == LexicalQuery::NoMatch { return Ok(Vec::new()); }
        Ok(restrict_to.iter().filter_map(|id| self.distances.get(id).map(|d| LexicalHit { chunk_id: *id, distance: *d })).collect())
    }
}

struct StubCorpus { texts: HashMap<ChunkId, String> }
impl CorpusStore for StubCorpus {
    fn chunk_texts(&self, ids: &[ChunkId]) -> anyhow::Result<HashMap<ChunkId, String>> {
        Ok(ids.iter().filter_map(|id| self.texts.get(id).map(|t| (*id, t.clone()))).collect())
    }
    fn doc_meta(&self, ids: &[ChunkId]) -> anyhow::Result<HashMap<ChunkId, DocMeta>> {
        Ok(ids.iter().filter(|id| self.texts.contains_key(id))
            .map(|id| (*id, DocMeta { doc_id: id / 10, title: format!("Doc {}", id / 10), url: format!("https://example.org/{id}") }))
            .collect())
    }
}

/// Scores each passage by a canned per-text value.
struct TableScorer(HashMap<String, f32>);
impl PairScorer for TableScorer {
    fn score_pairs(&self, _query: &str, texts: &[&str]) -> anyhow::Result<Vec<f32>> {
        Ok(texts.iter().map(|t| self.0.get(*t).copied().unwrap_or(0.0)).collect())
    }
}

struct Fixture {
    chunks: Vec<(ChunkId, f32, String)>,
    lexical: HashMap<ChunkId, f32>,
    lexical_fails: bool,
    rerank: HashMap<String, f32>,
    extra_hits: Vec<VectorHit>,
    unstored: Vec<ChunkId>,
}

impl Fixture {
    fn new(chunks: &[(ChunkId, f32, &str)]) -> Self {
        Self {
            chunks: chunks.iter().map(|(id, s, t)| (*id, *s, t.to_string())).collect(),
            lexical: HashMap::new(),
            lexical_fails: false,
            rerank: HashMap::new(),
            extra_hits: Vec::new(),
            unstored: Vec::new(),
        }
    }

    fn build(self) -> (QaPipeline, Arc<StubVectors>, Arc<StubLexical>) {
        let mut ids: Vec<ChunkId> = self.chunks.iter().map(|(id, _, _)| *id).collect();
        ids.extend(&self.unstored);
        let mut hits: Vec<VectorHit> = self.chunks.iter().enumerate().map(|(position, (_, score, _))| VectorHit { position, score: *score }).collect();
        hits.extend(self.extra_hits);
        let vectors = Arc::new(StubVectors { hits, requested: Mutex::new(Vec::new()) });
        let lexical = Arc::new(StubLexical { distances: self.lexical, fail: self.lexical_fails, queries: Mutex::new(Vec::new()) });
        let corpus = StubCorpus { texts: self.chunks.into_iter().map(|(id, _, t)| (id, t)).collect() };
        let capabilities = Capabilities {
            embedder: Arc::new(StubEmbedder),
            vector_index: vectors.clone(),
            mapping: Arc::new(IdMapping::new(ids).unwrap()),
            lexical_index: lexical.clone(),
            corpus: Arc::new(corpus),
        };
        let reranker = Reranker::CrossEncoder(Arc::new(TableScorer(self.rerank)));
        (QaPipeline::new(capabilities, reranker, &Settings::default()), vectors, lexical)
    }
}

#[test]
fn empty_candidates_abstain_with_no_contexts() {
    let (pipeline, _, _) = Fixture::new(&[]).build();
    for mode in [Mode::Baseline, Mode::Rerank] {
        let r = pipeline.answer("eye protection", 5, mode).unwrap();
        assert!(r.contexts.is_empty());
        assert!(r.answer.is_none());
        assert_eq!(r.abstain_reason.as_deref(), Some("no_contexts"));
    }
}

#[test]
fn baseline_below_threshold_abstains() {
    let (pipeline, _, _) = Fixture::new(&[(11, 0.25, SAFETY), (12, 0.10, "Unrelated text.")]).build();
    let r = pipeline.answer("eye protection required", 5, Mode::Baseline).unwrap();
    assert!(r.answer.is_none());
    assert_eq!(r.abstain_reason.as_deref(), Some("low_confidence_baseline:0.250"));
    assert_eq!(r.contexts.len(), 2, "contexts are returned even when abstaining");
    assert!(!r.reranker_used);
    assert!(r.contexts.iter().all(|c| c.rerank_score.is_none()));
}

#[test]
fn rerank_above_threshold_answers_with_top_sentence() {
    let mut f = Fixture::new(&[(21, 0.40, "Wear boots on site."), (22, 0.35, SAFETY)]);
    f.rerank.insert(SAFETY.to_string(), 0.50);
    f.rerank.insert("Wear boots on site.".to_string(), 0.20);
    let (pipeline, _, _) = f.build();

    let r = pipeline.answer("eye protection required", 5, Mode::Rerank).unwrap();
    assert!(r.reranker_used);
    assert!(r.abstain_reason.is_none());
    let answer = r.answer.expect("answer");
    assert_eq!(answer.citation.chunk_id, 22);
    assert_eq!(answer.citation.chunk_id, r.contexts[0].chunk_id);
    assert_eq!(answer.citation.title.as_deref(), Some("Doc 2"));
    assert_eq!(answer.citation.url.as_deref(), Some("https://example.org/22"));
    assert!(answer.snippet.starts_with("Eye protection is mandatory."));
    assert_eq!(r.contexts[0].rerank_score, Some(0.50));
}

#[test]
fn rerank_below_threshold_reports_rerank_score() {
    let mut f = Fixture::new(&[(1, 0.95, SAFETY)]);
    f.rerank.insert(SAFETY.to_string(), 0.2);
    let (pipeline, _, _) = f.build();
    let r = pipeline.answer("eye", 3, Mode::Rerank).unwrap();
    assert!(r.answer.is_none());
    assert_eq!(r.abstain_reason.as_deref(), Some("low_confidence_rerank:0.200"));
}

#[test]
fn pool_is_widened_and_contexts_capped_at_k() {
    let chunks: Vec<(ChunkId, f32, String)> = (0..70).map(|i| (100 + i, 0.9 - i as f32 * 0.01, format!("Passage {i}."))).collect();
    let refs: Vec<(ChunkId, f32, &str)> = chunks.iter().map(|(a, b, c)| (*a, *b, c.as_str())).collect();
    let (pipeline, vectors, _) = Fixture::new(&refs).build();

    let r = pipeline.answer("passage", 5, Mode::Baseline).unwrap();
    assert_eq!(r.contexts.len(), 5);
    let r = pipeline.answer("passage", 60, Mode::Baseline).unwrap();
    assert_eq!(r.contexts.len(), 60);
    assert_eq!(*vectors.requested.lock().unwrap(), vec![50, 60]);
}

#[test]
fn baseline_orders_by_vector_score_and_exposes_lexical_score() {
    let mut f = Fixture::new(&[(1, 0.5, "alpha."), (2, 0.9, "beta."), (3, 0.7, "gamma.")]);
    f.lexical.insert(3, -4.5);
    let (pipeline, _, lexical) = f.build();
    let r = pipeline.answer("Gamma, beta?", 3, Mode::Baseline).unwrap();
    let order: Vec<ChunkId> = r.contexts.iter().map(|c| c.chunk_id).collect();
    assert_eq!(order, vec![2, 3, 1]);
    assert!((r.contexts[1].lexical_score - 4.5).abs() < 1e-6, "distance is negated");
    assert_eq!(r.contexts[0].lexical_score, 0.0, "no lexical hit scores zero");
    let queries = lexical.queries.lock().unwrap();
    assert_eq!(queries[0].to_string(), "gamma OR beta");
}

#[test]
fn tokenless_query_uses_no_match_sentinel() {
    let mut f = Fixture::new(&[(1, 0.8, "alpha.")]);
    f.lexical.insert(1, -3.0);
    let (pipeline, _, lexical) = f.build();
    let r = pipeline.answer("?!", 1, Mode::Baseline).unwrap();
    assert_eq!(r.contexts[0].lexical_score, 0.0);
    assert_eq!(lexical.queries.lock().unwrap()[0], LexicalQuery::NoMatch);
}

#[test]
fn duplicates_unmapped_and_unstored_hits_are_dropped() {
    let mut f = Fixture::new(&[(1, 0.6, "one."), (2, 0.5, "two.")]);
    f.extra_hits = vec![
        VectorHit { position: 0, score: 0.95 },
        VectorHit { position: 2, score: 0.9 },
        VectorHit { position: 99, score: 0.99 },
    ];
    f.unstored = vec![77];
    let (pipeline, _, _) = f.build();
    let r = pipeline.answer("one two", 5, Mode::Baseline).unwrap();
    let got: Vec<(ChunkId, f32)> = r.contexts.iter().map(|c| (c.chunk_id, c.vector_score)).collect();
    assert_eq!(got, vec![(1, 0.95), (2, 0.5)]);
}

#[test]
fn display_text_is_truncated_but_rerank_snippet_reads_full_text() {
    let head = "Filler sentence about nothing in particular. ".repeat(8);
    let text = format!("{head}Eye protection is mandatory near grinders.");
    assert!(text.chars().count() > 300);
    let mut f = Fixture::new(&[(5, 0.9, &text)]);
    f.rerank.insert(text.clone(), 0.9);
    let (pipeline, _, _) = f.build();

    let r = pipeline.answer("eye protection grinders", 1, Mode::Rerank).unwrap();
    let ctx = &r.contexts[0];
    assert_eq!(ctx.text.chars().count(), 303);
    assert!(ctx.text.ends_with("..."));
    let snippet = r.answer.expect("answer").snippet;
    assert!(snippet.starts_with("Eye protection is mandatory near grinders."));

    let baseline = pipeline.answer("eye protection grinders", 1, Mode::Baseline).unwrap();
    let snippet = baseline.answer.expect("answer").snippet;
    assert_eq!(snippet.chars().count(), 300, "baseline answers keep the passage head");
    assert!(snippet.starts_with("Filler sentence"));
}

#[test]
fn invalid_requests_are_rejected() {
    let (pipeline, vectors, _) = Fixture::new(&[(1, 0.9, "one.")]).build();
    assert!(matches!(pipeline.answer("   ", 5, Mode::Rerank), Err(Error::InvalidInput(_))));
    assert!(matches!(pipeline.answer("one", 0, Mode::Rerank), Err(Error::InvalidInput(_))));
    assert!(vectors.requested.lock().unwrap().is_empty(), "rejected before retrieval");
}

#[test]
fn capability_failures_propagate() {
    let mut f = Fixture::new(&[(1, 0.9, "one.")]);
    f.lexical_fails = true;
    let (pipeline, _, _) = f.build();
    match pipeline.answer("one", 1, Mode::Baseline) {
        Err(Error::Capability { capability, .. }) => assert_eq!(capability, "lexical index"),
        other => panic!("expected capability error, got {other:?}"),
    }
}

#[test]
fn repeated_queries_are_identical() {
    let mut f = Fixture::new(&[(1, 0.6, SAFETY), (2, 0.7, "Wear boots.")]);
    f.rerank.insert(SAFETY.to_string(), 0.8);
    let (pipeline, _, _) = f.build();
    let a = pipeline.answer("eye protection", 2, Mode::Rerank).unwrap();
    let b = pipeline.answer("eye protection", 2, Mode::Rerank).unwrap();
    assert_eq!(a, b);
}

#[test]
fn linear_reranker_uses_fused_features() {
    // Lexical evidence outweighs the vector gap under this model.
    let vectors = Arc::new(StubVectors { hits: vec![VectorHit { position: 0, score: 0.9 }, VectorHit { position: 1, score: 0.4 }], requested: Mutex::new(Vec::new()) });
    let lexical = Arc::new(StubLexical { distances: HashMap::from([(2, -8.0)]), fail: false, queries: Mutex::new(Vec::new()) });
    let corpus = StubCorpus { texts: HashMap::from([(1, "alpha.".to_string()), (2, "beta.".to_string())]) };
    let capabilities = Capabilities {
        embedder: Arc::new(StubEmbedder),
        vector_index: vectors,
        mapping: Arc::new(IdMapping::new(vec![1, 2]).unwrap()),
        lexical_index: lexical,
        corpus: Arc::new(corpus),
    };
    let pipeline = QaPipeline::new(capabilities, Reranker::Linear(LogisticModel::new([1.0, 1.0], -2.0)), &Settings::default());
    let r = pipeline.answer("beta", 2, Mode::Rerank).unwrap();
    assert_eq!(r.contexts[0].chunk_id, 2);
    let p = r.contexts[0].rerank_score.unwrap();
    assert!(p > 0.99 && p <= 1.0);
}
