//! Offline build: embed every chunk, write the vector table, save the
//! position → chunk id mapping, and add an ANN index once the table is large
//! enough.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::info;

use citeqa_core::mapping::IdMapping;
use citeqa_core::traits::Embedder;
use citeqa_core::types::Chunk;

use crate::index_build::{build_ivfpq_index, compute_ivfpq_params, MIN_ROWS_FOR_ANN};
use crate::table::{open_db, open_table, reset_db_dir};
use crate::writer::LanceVectorWriter;

const EMBED_BATCH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub rows: usize,
    pub dim: usize,
    pub ann_index: bool,
}

/// Rebuilds the table from scratch. Vector `i` corresponds to `chunks[i]`.
pub fn build_vector_index(
    embedder: &dyn Embedder,
    chunks: &[Chunk],
    db_dir: &Path,
    table_name: &str,
    mapping_path: &Path,
) -> Result<BuildReport> {
    anyhow::ensure!(!chunks.is_empty(), "no chunks to index");
    let mapping = IdMapping::new(chunks.iter().map(|c| c.chunk_id).collect())?;
    let dim = embedder.dim();

    let mut vectors = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let embedded = embedder.embed_batch(&texts)?;
        anyhow::ensure!(embedded.len() == batch.len(), "embedder returned {} vectors for {} texts", embedded.len(), batch.len());
        vectors.extend(embedded);
    }
    info!(rows = vectors.len(), dim, "chunks embedded");

    reset_db_dir(db_dir)?;
    let rt = Runtime::new()?;
    let ann_index = rt.block_on(async {
        let db = open_db(db_dir).await?;
        let writer = LanceVectorWriter::new(db.clone(), table_name, dim);
        writer.write(&vectors).await?;
        if vectors.len() < MIN_ROWS_FOR_ANN {
            info!(rows = vectors.len(), "table below ANN threshold, searches stay exhaustive");
            return anyhow::Ok(false);
        }
        let table = open_table(&db, table_name).await?;
        build_ivfpq_index(&table, &compute_ivfpq_params(vectors.len(), dim)).await?;
        anyhow::Ok(true)
    }).with_context(|| format!("Failed to build vector index at {}", db_dir.display()))?;

    mapping.save(mapping_path)?;
    Ok(BuildReport { rows: vectors.len(), dim, ann_index })
}
