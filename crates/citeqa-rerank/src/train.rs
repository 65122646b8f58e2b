//! Offline fitting of the learned reranker from exported feature rows.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use citeqa_core::types::ChunkId;

use crate::model::LogisticModel;

/// One exported (question, chunk) pair. `label` is `None` for unlabeled rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub q: String,
    pub chunk_id: ChunkId,
    pub vector_score: f32,
    pub lexical_score: f32,
    #[serde(default)]
    pub label: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainOptions {
    pub seed: u64,
    pub validation_fraction: f64,
    pub max_iter: usize,
    /// L2 penalty on the weights (not the bias).
    pub l2: f64,
    pub tolerance: f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self { seed: 42, validation_fraction: 0.3, max_iter: 1000, l2: 1e-3, tolerance: 1e-7 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub model: LogisticModel,
    pub n_train: usize,
    pub n_validation: usize,
    /// `None` when the validation split holds a single class.
    pub validation_auc: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub features: [f32; 2],
    pub positive: bool,
}

/// Labeled rows as samples; unlabeled rows are dropped. Any nonzero label is positive.
pub fn labeled_samples(rows: &[TrainingRow]) -> Vec<Sample> {
    rows.iter()
        .filter_map(|r| r.label.map(|l| Sample { features: [r.vector_score, r.lexical_score], positive: l != 0 }))
        .collect()
}

/// Per-class shuffle and split so both sides keep the class ratio.
pub fn stratified_split(samples: &[Sample], validation_fraction: f64, seed: u64) -> (Vec<Sample>, Vec<Sample>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut validation = Vec::new();
    for class in [true, false] {
        let mut members: Vec<Sample> = samples.iter().copied().filter(|s| s.positive == class).collect();
        members.shuffle(&mut rng);
        let n_validation = ((members.len() as f64) * validation_fraction).round() as usize;
        let n_validation = n_validation.min(members.len().saturating_sub(1));
        validation.extend(members.drain(..n_validation));
        train.extend(members);
    }
    (train, validation)
}

/// L2-regularized logistic regression by full-batch gradient descent.
///
/// The step size is `4 / max‖x‖²` (bias included), below the inverse
/// smoothness bound of the logistic loss, so iterations never diverge.
pub fn fit_logistic(samples: &[Sample], options: &TrainOptions) -> Result<([f64; 2], f64)> {
    anyhow::ensure!(!samples.is_empty(), "no labeled samples to fit");
    let n = samples.len() as f64;
    let max_sq = samples.iter()
        .map(|s| 1.0 + s.features.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>())
        .fold(1.0f64, f64::max);
    let step = 4.0 / (max_sq + options.l2);
    let mut w = [0.0f64; 2];
    let mut b = 0.0f64;
    for iter in 0..options.max_iter {
        let mut grad_w = [0.0f64; 2];
        let mut grad_b = 0.0f64;
        for s in samples {
            let x = [f64::from(s.features[0]), f64::from(s.features[1])];
            let p = 1.0 / (1.0 + (-(w[0] * x[0] + w[1] * x[1] + b)).exp());
            let err = p - if s.positive { 1.0 } else { 0.0 };
            grad_w[0] += err * x[0];
            grad_w[1] += err * x[1];
            grad_b += err;
        }
        for j in 0..2 { grad_w[j] = grad_w[j] / n + options.l2 * w[j]; }
        grad_b /= n;
        for j in 0..2 { w[j] -= step * grad_w[j]; }
        b -= step * grad_b;
        let norm = (grad_w[0].powi(2) + grad_w[1].powi(2) + grad_b.powi(2)).sqrt();
        if norm < options.tolerance {
            info!(iterations = iter + 1, "logistic regression converged");
            break;
        }
    }
    Ok((w, b))
}

/// Area under the ROC curve via the rank statistic, ties averaged. `None`
/// unless both classes are present.
pub fn roc_auc(scores: &[f32], positives: &[bool]) -> Option<f32> {
    let n_pos = positives.iter().filter(|p| **p).count();
    let n_neg = positives.len() - n_pos;
    if n_pos == 0 || n_neg == 0 || scores.len() != positives.len() { return None; }
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    let mut ranks = vec![0.0f64; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] { j += 1; }
        // 1-based average rank of the tie group.
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] { ranks[idx] = avg; }
        i = j + 1;
    }
    let pos_rank_sum: f64 = ranks.iter().zip(positives).filter(|(_, p)| **p).map(|(r, _)| *r).sum();
    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some((u / (n_pos * n_neg) as f64) as f32)
}

pub fn train(rows: &[TrainingRow], options: &TrainOptions) -> Result<TrainReport> {
    let samples = labeled_samples(rows);
    anyhow::ensure!(!samples.is_empty(), "no labeled rows among {} feature rows", rows.len());
    let positives = samples.iter().filter(|s| s.positive).count();
    if positives == 0 || positives == samples.len() {
        warn!(samples = samples.len(), positives, "training data holds a single class");
    }
    let (train_set, validation_set) = stratified_split(&samples, options.validation_fraction, options.seed);
    let (w, b) = fit_logistic(&train_set, options)?;
    let mut model = LogisticModel::new([w[0] as f32, w[1] as f32], b as f32);

    let scores: Vec<f32> = validation_set.iter().map(|s| model.predict_proba(s.features)).collect();
    let labels: Vec<bool> = validation_set.iter().map(|s| s.positive).collect();
    let validation_auc = roc_auc(&scores, &labels);
    model.validation_auc = validation_auc;
    model.trained_at = chrono::Utc::now().to_rfc3339();
    info!(train = train_set.len(), validation = validation_set.len(), auc = ?validation_auc, "reranker trained");
    Ok(TrainReport { model, n_train: train_set.len(), n_validation: validation_set.len(), validation_auc })
}
