//! The request path: candidates → lexical fusion → ordering → gate → answer.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use citeqa_core::config::{DisplaySettings, RetrievalSettings, Settings, Thresholds};
use citeqa_core::error::{Error, Result};
use citeqa_core::mapping::IdMapping;
use citeqa_core::text::{display_text, truncate_chars};
use citeqa_core::traits::{CorpusStore, Embedder, LexicalIndex, VectorIndex};
use citeqa_core::types::{AskRequest, AskResponse, ChunkId, DocMeta, Mode, RankedResult, ScoredCandidate};
use citeqa_rerank::Reranker;

use crate::answer::assemble;
use crate::fusion::{attach_lexical_scores, baseline_order};
use crate::gate::{decide, GateDecision};
use crate::retriever::CandidateRetriever;
use crate::snippet::extract_snippet_with;

/// Everything the pipeline reads from. Opened once, shared read-only.
pub struct Capabilities {
    pub embedder: Arc<dyn Embedder>,
    pub vector_index: Arc<dyn VectorIndex>,
    pub mapping: Arc<IdMapping>,
    pub lexical_index: Arc<dyn LexicalIndex>,
    pub corpus: Arc<dyn CorpusStore>,
}

pub struct QaPipeline {
    pub(crate) retriever: CandidateRetriever,
    pub(crate) lexical: Arc<dyn LexicalIndex>,
    reranker: Reranker,
    retrieval: RetrievalSettings,
    thresholds: Thresholds,
    display: DisplaySettings,
}

impl QaPipeline {
    pub fn new(capabilities: Capabilities, reranker: Reranker, settings: &Settings) -> Self {
        let Capabilities { embedder, vector_index, mapping, lexical_index, corpus } = capabilities;
        Self {
            retriever: CandidateRetriever::new(embedder, vector_index, mapping, corpus),
            lexical: lexical_index,
            reranker,
            retrieval: settings.retrieval.clone(),
            thresholds: settings.thresholds,
            display: settings.display.clone(),
        }
    }

    pub fn reranker(&self) -> &Reranker {
        &self.reranker
    }

    pub fn default_k(&self) -> usize {
        self.retrieval.default_k
    }

    pub fn ask(&self, request: &AskRequest) -> Result<AskResponse> {
        self.answer(&request.q, request.k, request.mode)
    }

    /// Retrieved candidates with lexical scores attached, vector order.
    pub fn fused_candidates(&self, query: &str, top_k: usize) -> Result<Vec<ScoredCandidate>> {
        let candidates = self.retriever.retrieve(query, top_k)?;
        attach_lexical_scores(self.lexical.as_ref(), query, candidates)
    }

    /// Answer `query` from at most `k` contexts ordered per `mode`.
    pub fn answer(&self, query: &str, k: usize, mode: Mode) -> Result<AskResponse> {
        AskRequest::new(query, k, mode).validate()?;
        let pool = k.max(self.retrieval.candidate_pool);
        let scored = self.fused_candidates(query, pool)?;
        debug!(candidates = scored.len(), pool, "candidates fused");

        let mut contexts = match mode {
            Mode::Baseline => baseline_order(scored),
            Mode::Rerank => self.reranker.rerank(query, scored).map_err(Error::capability("reranker"))?,
        };
        contexts.truncate(k);
        self.attach_doc_meta(&mut contexts)?;

        let (answer, abstain_reason) = match decide(&contexts, mode, &self.thresholds) {
            GateDecision::Abstain(reason) => (None, Some(reason.to_string())),
            GateDecision::Accept => {
                let top = &contexts[0];
                let snippet = match mode {
                    // Baseline answers keep the passage head; only rerank extracts.
                    Mode::Baseline => truncate_chars(&top.text, self.display.context_chars).to_string(),
                    Mode::Rerank => extract_snippet_with(
                        query,
                        &top.text,
                        self.display.snippet_sentences,
                        self.display.snippet_chars,
                        self.display.context_chars,
                    ),
                };
                (Some(assemble(top, snippet)), None)
            }
        };

        for c in &mut contexts {
            c.text = display_text(&c.text, self.display.context_chars);
        }
        info!(mode = %mode, k, contexts = contexts.len(), answered = answer.is_some(), reranker = self.reranker.name(), "answered");
        Ok(AskResponse { answer, contexts, reranker_used: mode == Mode::Rerank, abstain_reason })
    }

    fn attach_doc_meta(&self, contexts: &mut [RankedResult]) -> Result<()> {
        if contexts.is_empty() {
            return Ok(());
        }
        let ids: Vec<ChunkId> = contexts.iter().map(|c| c.chunk_id).collect();
        let mut meta: HashMap<ChunkId, DocMeta> = self.retriever.corpus.doc_meta(&ids).map_err(Error::capability("corpus store"))?;
        for c in contexts.iter_mut() {
            if let Some(m) = meta.remove(&c.chunk_id) {
                c.title = Some(m.title);
                c.url = Some(m.url);
            }
        }
        Ok(())
    }
}
