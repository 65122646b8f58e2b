//! IVF_PQ index over the vector column. Small tables are searched exhaustively.
use anyhow::Result;
use lancedb::{Table, index::{Index, vector::IvfPqIndexBuilder}};
use lancedb::DistanceType;
use tracing::info;

use crate::schema::VECTOR_COLUMN;

/// PQ codebooks need at least this many rows to train.
pub const MIN_ROWS_FOR_ANN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IvfPqParams {
    pub nlist: usize,
    pub m: usize,
}

pub fn compute_ivfpq_params(total_rows: usize, dim: usize) -> IvfPqParams {
    let sqrt_n = (total_rows as f64).sqrt() as usize;
    let mut nlist = (2 * sqrt_n).clamp(1, 65536);
    if total_rows > 1 { nlist = nlist.min(total_rows - 1); } else { nlist = 1; }
    // Sub-vector count must divide the dimension.
    let preferred = if dim >= 1024 { 32 } else { 16 };
    let m = (1..=preferred).rev().find(|m| dim % m == 0).unwrap_or(1);
    IvfPqParams { nlist, m }
}

pub async fn build_ivfpq_index(table: &Table, params: &IvfPqParams) -> Result<()> {
    info!(nlist = params.nlist, m = params.m, "building IVF_PQ index");
    table
        .create_index(
            &[VECTOR_COLUMN],
            Index::IvfPq(
                IvfPqIndexBuilder::default()
                    .distance_type(DistanceType::Cosine)
                    .num_partitions(params.nlist as u32)
                    .num_sub_vectors(params.m as u32),
            ),
        )
        .execute()
        .await?;
    Ok(())
}
