use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::chunker::{chunk_text, ChunkingConfig};
use crate::store::SqliteCorpus;

/// One row of the sources manifest. `filename` is relative to the raw text dir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub filename: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub skipped: usize,
}

/// `Ok(None)` when the manifest file does not exist.
pub fn load_manifest(path: &Path) -> Result<Option<Vec<SourceEntry>>> {
    if !path.exists() { return Ok(None); }
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let entries = serde_json::from_str(&raw).with_context(|| format!("Failed to parse manifest {}", path.display()))?;
    Ok(Some(entries))
}

/// Every `.txt` file under `root`, titled by file stem.
pub fn discover_sources(root: &Path) -> Vec<SourceEntry> {
    let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
        .collect();
    txt_files.sort();
    txt_files.into_iter().map(|path| {
        let filename = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().to_string();
        let title = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| filename.clone());
        SourceEntry { filename, title, url: String::new() }
    }).collect()
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

/// Recreate the corpus from `raw_dir`. Sources come from `manifest` when it
/// exists, otherwise from the `.txt` files found under `raw_dir`.
pub fn ingest_directory(corpus: &SqliteCorpus, raw_dir: &Path, manifest: Option<&Path>, config: ChunkingConfig) -> Result<IngestReport> {
    let sources = match manifest.map(load_manifest).transpose()?.flatten() {
        Some(entries) => entries,
        None => discover_sources(raw_dir),
    };
    if sources.is_empty() {
        warn!(dir = %raw_dir.display(), "no sources to ingest");
    }
    corpus.reset()?;
    let mut report = IngestReport::default();
    for (i, source) in sources.iter().enumerate() {
        let path = raw_dir.join(&source.filename);
        if !path.is_file() {
            warn!(file = %path.display(), "source file missing, skipped");
            report.skipped += 1;
            continue;
        }
        let content = read_file_content(&path)?;
        let chunks = chunk_text(&content, config);
        if chunks.is_empty() {
            warn!(file = %path.display(), "source file has no text, skipped");
            report.skipped += 1;
            continue;
        }
        let doc_id = corpus.insert_document(&source.filename, &source.title, &source.url)?;
        let inserted = corpus.insert_chunks(doc_id, &chunks)?;
        info!(n = i + 1, total = sources.len(), file = %source.filename, chunks = inserted.len(), "ingested");
        report.documents += 1;
        report.chunks += inserted.len();
    }
    info!(documents = report.documents, chunks = report.chunks, skipped = report.skipped, "ingestion complete");
    Ok(report)
}
