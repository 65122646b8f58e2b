use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;

use candle_core::Device;
use candle_transformers::models::xlm_roberta::XLMRobertaForSequenceClassification;
use tokenizers::Tokenizer;
use tracing::info;

use citeqa_core::score::sigmoid;
use citeqa_core::text::token_set;
use citeqa_core::traits::PairScorer;

use crate::tokenize::{tokenize_pair_on_device, with_pair_truncation};
use crate::{device, load_config, load_tokenizer, load_weights, use_fake_models};

/// Token budget for a (query, passage) pair.
pub const PAIR_MAX_LEN: usize = 512;

/// Single-logit sequence classifier; scores are `sigmoid(logit)` in (0, 1).
pub struct CrossEncoderModel { model: XLMRobertaForSequenceClassification, tokenizer: Tokenizer, device: Device, max_len: usize }

impl CrossEncoderModel {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = device::select_device();
        info!(dir = %model_dir.display(), "loading cross-encoder");
        let tokenizer = with_pair_truncation(load_tokenizer(model_dir)?, PAIR_MAX_LEN)?;
        let config = load_config(model_dir)?;
        let vb = load_weights(model_dir, &device)?;
        let model = XLMRobertaForSequenceClassification::new(1, &config, vb)?;
        Ok(Self { model, tokenizer, device, max_len: PAIR_MAX_LEN })
    }

    fn score_one(&self, query: &str, passage: &str) -> Result<f32> {
        let (input_ids, attention_mask) = tokenize_pair_on_device(&self.tokenizer, query, passage, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let logits = self.model.forward(&input_ids, &attention_mask, &token_type_ids)?;
        let logits: Vec<f32> = logits.to_device(&Device::Cpu)?.flatten_all()?.to_vec1()?;
        let logit = logits.first().copied().ok_or_else(|| anyhow::anyhow!("cross-encoder returned no logit"))?;
        Ok(sigmoid(logit))
    }
}

impl PairScorer for CrossEncoderModel {
    fn score_pairs(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>> {
        texts.iter().map(|t| self.score_one(query, t)).collect()
    }
}

/// Fraction of distinct query tokens present in the passage.
pub struct FakePairScorer;

impl PairScorer for FakePairScorer {
    fn score_pairs(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>> {
        let q = token_set(query);
        Ok(texts.iter().map(|t| {
            if q.is_empty() { return 0.0; }
            let p: HashSet<String> = token_set(t);
            q.intersection(&p).count() as f32 / q.len() as f32
        }).collect())
    }
}

pub fn get_default_pair_scorer(model_dir: &Path) -> Result<Box<dyn PairScorer>> {
    if use_fake_models() { info!("using FakePairScorer"); return Ok(Box::new(FakePairScorer)); }
    Ok(Box::new(CrossEncoderModel::load(model_dir)?))
}
