//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (`__` separates nesting, e.g.
//! `APP_THRESHOLDS__RERANK=0.5`). Paths expand `~` and `${VAR}` and resolve
//! relative to the directory the config was loaded from.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::Mode;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(base_dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base_dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(base_dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base_dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base_dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: base_dir.to_path_buf() };
        config.settings()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed, validated view of the merged configuration.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Expand and resolve a configured path against the config base dir.
    pub fn resolve<S: AsRef<str>>(&self, p: S) -> PathBuf {
        resolve_with_base(&self.base_dir, p)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub retrieval: RetrievalSettings,
    pub thresholds: Thresholds,
    pub display: DisplaySettings,
    pub ingest: IngestSettings,
}

impl Settings {
    pub fn validate(&self) -> crate::error::Result<()> {
        self.thresholds.validate()?;
        if self.retrieval.candidate_pool == 0 {
            return Err(Error::InvalidConfig("retrieval.candidate_pool must be at least 1".into()));
        }
        if self.retrieval.default_k == 0 {
            return Err(Error::InvalidConfig("retrieval.default_k must be at least 1".into()));
        }
        if self.display.context_chars == 0 || self.display.snippet_chars == 0 {
            return Err(Error::InvalidConfig("display lengths must be at least 1".into()));
        }
        if self.display.snippet_sentences == 0 {
            return Err(Error::InvalidConfig("display.snippet_sentences must be at least 1".into()));
        }
        if self.ingest.overlap_chars >= self.ingest.max_chars {
            return Err(Error::InvalidConfig(format!(
                "ingest.overlap_chars ({}) must be below ingest.max_chars ({})",
                self.ingest.overlap_chars, self.ingest.max_chars
            )));
        }
        Ok(())
    }
}

/// On-disk artifacts. Relative values resolve via [`Config::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub corpus_db: String,
    pub lexical_index_dir: String,
    pub vector_db_dir: String,
    pub vector_table: String,
    pub id_mapping: String,
    pub reranker_artifact: String,
    pub embed_model_dir: String,
    pub cross_encoder_dir: String,
    pub sources_manifest: String,
    pub raw_text_dir: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            corpus_db: "data/chunks.db".into(),
            lexical_index_dir: "data/indexes/tantivy".into(),
            vector_db_dir: "data/indexes/lancedb".into(),
            vector_table: "chunk_vectors".into(),
            id_mapping: "data/indexes/id_mapping.json".into(),
            reranker_artifact: "data/reranker_lr.json".into(),
            embed_model_dir: "models/bge-m3".into(),
            cross_encoder_dir: "models/bge-reranker-base".into(),
            sources_manifest: "data/sources.json".into(),
            raw_text_dir: "data/txt".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Lower bound on candidates pulled from the vector index per query.
    pub candidate_pool: usize,
    pub default_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { candidate_pool: 50, default_k: 5 }
    }
}

/// Abstention thresholds. These are calibrated against the shipped embedding
/// and cross-encoder models; re-tune them whenever either model changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub baseline: f32,
    pub rerank: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { baseline: 0.30, rerank: 0.45 }
    }
}

impl Thresholds {
    pub fn for_mode(&self, mode: Mode) -> f32 {
        match mode {
            Mode::Baseline => self.baseline,
            Mode::Rerank => self.rerank,
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.baseline.is_finite() || !self.rerank.is_finite() {
            return Err(Error::InvalidConfig("thresholds must be finite".into()));
        }
        if !(-1.0..=1.0).contains(&self.baseline) {
            return Err(Error::InvalidConfig(format!(
                "thresholds.baseline {} is outside the cosine range [-1, 1]",
                self.baseline
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub context_chars: usize,
    pub snippet_chars: usize,
    pub snippet_sentences: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { context_chars: 300, snippet_chars: 500, snippet_sentences: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self { max_chars: 1200, overlap_chars: 200 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
