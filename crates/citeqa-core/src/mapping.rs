//! Position → chunk id translation for the vector index.
//!
//! Index-internal positions are dense `0..n` in insertion order; corpus chunk
//! ids are not. The mapping is written next to the index at build time and
//! loaded read-only for serving.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::types::ChunkId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdMapping {
    chunk_ids: Vec<ChunkId>,
}

impl IdMapping {
    pub fn new(chunk_ids: Vec<ChunkId>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(chunk_ids.len());
        for id in &chunk_ids {
            if !seen.insert(*id) {
                anyhow::bail!("chunk id {id} appears twice in id mapping");
            }
        }
        Ok(Self { chunk_ids })
    }

    pub fn len(&self) -> usize {
        self.chunk_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_ids.is_empty()
    }

    /// `None` for positions the index should never have produced.
    pub fn chunk_id(&self, position: usize) -> Option<ChunkId> {
        self.chunk_ids.get(position).copied()
    }

    pub fn chunk_ids(&self) -> &[ChunkId] {
        &self.chunk_ids
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read id mapping {}", path.display()))?;
        let ids: Vec<ChunkId> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse id mapping {}", path.display()))?;
        Self::new(ids)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(&self.chunk_ids)?)
            .with_context(|| format!("Failed to write id mapping {}", path.display()))?;
        Ok(())
    }
}
