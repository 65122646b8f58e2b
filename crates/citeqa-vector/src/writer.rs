use anyhow::Result;
use arrow_array::{FixedSizeListArray, Int64Array, RecordBatch, RecordBatchIterator};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::sync::Arc;
use tracing::info;

use crate::schema::build_vector_schema;
use crate::table::table_exists;

const WRITE_BATCH: usize = 1000;

/// Appends vectors to one table; row `i` is stored with position `i`.
pub struct LanceVectorWriter { pub(crate) db: Connection, pub(crate) table_name: String, dim: usize }

impl LanceVectorWriter {
	pub fn new(db: Connection, table_name: &str, dim: usize) -> Self {
		Self { db, table_name: table_name.to_string(), dim }
	}

	pub async fn write(&self, vectors: &[Vec<f32>]) -> Result<usize> {
		if vectors.is_empty() { info!("no vectors to write"); return Ok(0); }
		if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != self.dim) {
			anyhow::bail!("vector {} has {} dims, expected {}", i, v.len(), self.dim);
		}
		info!(rows = vectors.len(), table = %self.table_name, "writing vectors");
		let pb = ProgressBar::new(vectors.len() as u64);
		pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} vectors ({percent}%)")?.progress_chars("#>-"));
		let mut written = 0usize;
		for (b, batch) in vectors.chunks(WRITE_BATCH).enumerate() {
			let first_position = b * WRITE_BATCH;
			self.insert_batch(first_position, batch).await?;
			written += batch.len(); pb.set_position(written as u64);
		}
		pb.finish_and_clear();
		info!(rows = written, "vector table written");
		Ok(written)
	}

	async fn insert_batch(&self, first_position: usize, vectors: &[Vec<f32>]) -> Result<()> {
		let record_batch = self.to_record_batch(first_position, vectors)?; let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		if table_exists(&self.db, &self.table_name).await? {
			self.db.open_table(&self.table_name).execute().await?.add(reader).execute().await?;
		} else {
			self.db.create_table(&self.table_name, reader).execute().await?;
		}
		Ok(())
	}

	fn to_record_batch(&self, first_position: usize, vectors: &[Vec<f32>]) -> Result<RecordBatch> {
		let dim = i32::try_from(self.dim)?;
		let positions: Vec<i64> = (first_position..first_position + vectors.len()).map(|p| p as i64).collect();
		let values: Vec<Option<Vec<Option<f32>>>> = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect())).collect();
		let record_batch = RecordBatch::try_new(build_vector_schema(dim), vec![
			Arc::new(Int64Array::from(positions)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(values.into_iter(), dim)),
		])?;
		Ok(record_batch)
	}
}
