use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use citeqa_core::config::Config;
use citeqa_core::mapping::IdMapping;
use citeqa_core::traits::{PairScorer, VectorIndex};
use citeqa_corpus::SqliteCorpus;
use citeqa_embed::{get_default_embedder, get_default_pair_scorer};
use citeqa_rerank::Reranker;
use citeqa_text::TantivyLexicalIndex;
use citeqa_vector::LanceVectorIndex;

use crate::pipeline::{Capabilities, QaPipeline};

/// Open every serving artifact named by `config` and wire the pipeline.
pub fn open_pipeline(config: &Config) -> Result<QaPipeline> {
    let settings = config.settings()?;
    let paths = &settings.paths;

    let corpus = SqliteCorpus::open_read_only(&config.resolve(&paths.corpus_db))?;
    let lexical = TantivyLexicalIndex::open(&config.resolve(&paths.lexical_index_dir))?;
    let vector = LanceVectorIndex::open(&config.resolve(&paths.vector_db_dir), &paths.vector_table)?;
    let mapping_path = config.resolve(&paths.id_mapping);
    let mapping = IdMapping::load(&mapping_path).with_context(|| format!("Missing id mapping; run build-index ({})", mapping_path.display()))?;
    if mapping.len() != vector.len() {
        warn!(mapping = mapping.len(), index = vector.len(), "id mapping and vector index sizes differ; rebuild the index");
    }
    let embedder = get_default_embedder(&config.resolve(&paths.embed_model_dir))?;

    let cross_encoder_dir = config.resolve(&paths.cross_encoder_dir);
    let reranker = Reranker::select(&config.resolve(&paths.reranker_artifact), || {
        let scorer: Arc<dyn PairScorer> = Arc::from(get_default_pair_scorer(&cross_encoder_dir)?);
        Ok(scorer)
    })?;
    info!(reranker = reranker.name(), chunks = vector.len(), "pipeline ready");

    let capabilities = Capabilities {
        embedder: Arc::from(embedder),
        vector_index: Arc::new(vector) as Arc<dyn VectorIndex>,
        mapping: Arc::new(mapping),
        lexical_index: Arc::new(lexical),
        corpus: Arc::new(corpus),
    };
    Ok(QaPipeline::new(capabilities, reranker, &settings))
}
