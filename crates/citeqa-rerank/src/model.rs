use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use citeqa_core::score::sigmoid;

pub const FEATURE_NAMES: [&str; 2] = ["vector_score", "lexical_score"];

/// Trained logistic regression over `[vector_score, lexical_score]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: [f32; 2],
    pub bias: f32,
    #[serde(default = "default_feature_names")]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub trained_at: String,
    #[serde(default)]
    pub validation_auc: Option<f32>,
}

fn default_feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

impl LogisticModel {
    pub fn new(weights: [f32; 2], bias: f32) -> Self {
        Self { weights, bias, feature_names: default_feature_names(), trained_at: String::new(), validation_auc: None }
    }

    /// Probability of relevance, `sigmoid(w·x + b)`.
    pub fn predict_proba(&self, features: [f32; 2]) -> f32 {
        let z = self.weights[0] * features[0] + self.weights[1] * features[1] + self.bias;
        sigmoid(z)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read reranker artifact {}", path.display()))?;
        let model: Self = serde_json::from_str(&raw).with_context(|| format!("Corrupt reranker artifact {}", path.display()))?;
        model.validate().with_context(|| format!("Corrupt reranker artifact {}", path.display()))?;
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() { std::fs::create_dir_all(parent)?; }
        std::fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write reranker artifact {}", path.display()))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.weights.iter().all(|w| w.is_finite()) && self.bias.is_finite(), "non-finite coefficients");
        anyhow::ensure!(
            self.feature_names.iter().map(String::as_str).eq(FEATURE_NAMES),
            "unexpected feature names {:?}", self.feature_names
        );
        Ok(())
    }
}
