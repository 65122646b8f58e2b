use anyhow::{Context, Result};
use arrow_array::{Array, Float32Array, Int64Array};
use futures::TryStreamExt;
use lancedb::{DistanceType, Table};
use lancedb::query::{ExecutableQuery, QueryBase};
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::debug;

use citeqa_core::traits::VectorIndex;
use citeqa_core::types::VectorHit;

use crate::schema::{DISTANCE_COLUMN, POSITION_COLUMN};
use crate::table::{open_db, open_table};

/// Candidates fetched per requested hit before exact re-scoring.
const REFINE_FACTOR: u32 = 4;

/// Read-only handle on a built vector table. Owns a runtime so the sync
/// [`VectorIndex`] contract can drive the async LanceDB client.
pub struct LanceVectorIndex { rt: Runtime, table: Table, rows: usize }

impl LanceVectorIndex {
	pub fn open(db_dir: &Path, table_name: &str) -> Result<Self> {
		let rt = Runtime::new()?;
		let (table, rows) = rt.block_on(async {
			let db = open_db(db_dir).await?;
			let table = open_table(&db, table_name).await?;
			let rows = table.count_rows(None).await?;
			anyhow::Ok((table, rows))
		}).with_context(|| format!("Failed to open vector index at {}", db_dir.display()))?;
		Ok(Self { rt, table, rows })
	}

	async fn search_async(&self, query_vec: &[f32], k: usize) -> Result<Vec<VectorHit>> {
		// Refine re-scores ANN candidates against the stored vectors so `_distance`
		// is the exact cosine distance, not the PQ estimate.
		let mut stream = self.table.vector_search(query_vec.to_vec())?
			.distance_type(DistanceType::Cosine)
			.refine_factor(REFINE_FACTOR)
			.limit(k)
			.execute().await?;
		let mut hits = Vec::new();
		while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
			let positions = batch.column_by_name(POSITION_COLUMN).and_then(|c| c.as_any().downcast_ref::<Int64Array>())
				.ok_or_else(|| anyhow::anyhow!("vector result without '{}' column", POSITION_COLUMN))?;
			let distances = batch.column_by_name(DISTANCE_COLUMN).and_then(|c| c.as_any().downcast_ref::<Float32Array>())
				.ok_or_else(|| anyhow::anyhow!("vector result without '{}' column", DISTANCE_COLUMN))?;
			for i in 0..batch.num_rows() {
				if positions.is_null(i) || distances.is_null(i) { continue; }
				let Ok(position) = usize::try_from(positions.value(i)) else { continue };
				// Cosine distance is 1 - cosine similarity.
				hits.push(VectorHit { position, score: 1.0 - distances.value(i) });
			}
		}
		hits.sort_by(|a, b| b.score.total_cmp(&a.score));
		hits.truncate(k);
		Ok(hits)
	}
}

impl VectorIndex for LanceVectorIndex {
	fn len(&self) -> usize { self.rows }

	fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<VectorHit>> {
		if k == 0 || self.rows == 0 { return Ok(Vec::new()); }
		let hits = self.rt.block_on(self.search_async(query_vec, k.min(self.rows)))?;
		debug!(k, hits = hits.len(), "vector search");
		Ok(hits)
	}
}
