use anyhow::Result;

use citeqa_core::traits::VectorIndex;
use citeqa_core::types::VectorHit;

/// Exact inner-product search over normalized vectors held in memory.
pub struct FlatIndex { dim: usize, vectors: Vec<Vec<f32>> }

impl FlatIndex {
	pub fn new(dim: usize) -> Self { Self { dim, vectors: Vec::new() } }

	pub fn from_vectors(dim: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
		let mut index = Self::new(dim);
		index.add(vectors)?;
		Ok(index)
	}

	pub fn dim(&self) -> usize { self.dim }

	/// Appends in order; the first added vector gets the next free position.
	pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<()> {
		if let Some(v) = vectors.iter().find(|v| v.len() != self.dim) {
			anyhow::bail!("vector has {} dims, index expects {}", v.len(), self.dim);
		}
		self.vectors.extend(vectors);
		Ok(())
	}
}

impl VectorIndex for FlatIndex {
	fn len(&self) -> usize { self.vectors.len() }

	fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<VectorHit>> {
		anyhow::ensure!(query_vec.len() == self.dim, "query has {} dims, index expects {}", query_vec.len(), self.dim);
		let mut hits: Vec<VectorHit> = self.vectors.iter().enumerate()
			.map(|(position, v)| VectorHit { position, score: v.iter().zip(query_vec).map(|(a, b)| a * b).sum() })
			.collect();
		// Stable sort keeps lower positions first among equal scores.
		hits.sort_by(|a, b| b.score.total_cmp(&a.score));
		hits.truncate(k);
		Ok(hits)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn exact_search_orders_by_inner_product() {
		let index = FlatIndex::from_vectors(2, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.6, 0.8]]).unwrap();
		let hits = index.search(&[0.0, 1.0], 2).unwrap();
		assert_eq!(hits.iter().map(|h| h.position).collect::<Vec<_>>(), vec![1, 2]);
		assert!((hits[1].score - 0.8).abs() < 1e-6);
		assert!(index.search(&[1.0], 2).is_err());
		assert!(FlatIndex::new(2).search(&[1.0, 0.0], 5).unwrap().is_empty());
	}
}
