use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use citeqa_core::config::{Config, Settings};
use citeqa_core::jsonl::{read_jsonl, write_jsonl};
use citeqa_corpus::chunker::ChunkingConfig;
use citeqa_corpus::{ingest_directory, SqliteCorpus};
use citeqa_embed::get_default_embedder;
use citeqa_pipeline::eval::{evaluate, write_csv};
use citeqa_pipeline::features::{export_features, LabeledQuestion};
use citeqa_pipeline::open_pipeline;
use citeqa_rerank::{train, TrainOptions};
use citeqa_text::TantivyLexicalIndex;
use citeqa_vector::build_vector_index;

mod args;
use args::Command;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let command = match args::parse(&argv) {
        Ok(c) => c,
        Err(e) => { eprintln!("{}", e); std::process::exit(2); }
    };
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    match command {
        Command::Ingest { raw_dir } => ingest(&config, &settings, raw_dir),
        Command::BuildIndex => build_index(&config, &settings),
        Command::Ask { query, k, mode } => {
            let pipeline = open_pipeline(&config)?;
            let k = k.unwrap_or_else(|| pipeline.default_k());
            let response = pipeline.answer(&query, k, mode)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Command::Features { questions, out, top_k } => {
            let pipeline = open_pipeline(&config)?;
            let questions: Vec<LabeledQuestion> = read_jsonl(&questions)?;
            let rows = export_features(&pipeline, &questions, top_k)?;
            let out = out.unwrap_or_else(|| config.resolve("data/features.jsonl"));
            write_jsonl(&out, &rows)?;
            println!("Wrote {} feature rows to {}", rows.len(), out.display());
            Ok(())
        }
        Command::Train { features, out, seed } => {
            let rows: Vec<citeqa_rerank::TrainingRow> = read_jsonl(&features)?;
            let report = train(&rows, &TrainOptions { seed, ..TrainOptions::default() })?;
            let out = out.unwrap_or_else(|| config.resolve(&settings.paths.reranker_artifact));
            report.model.save(&out)?;
            match report.validation_auc {
                Some(auc) => println!("Validation ROC-AUC: {:.4}", auc),
                None => println!("Validation ROC-AUC: n/a (single class in validation split)"),
            }
            println!("Saved reranker to {}", out.display());
            Ok(())
        }
        Command::Eval { questions, out, k } => {
            let pipeline = open_pipeline(&config)?;
            let questions: Vec<String> = read_jsonl::<LabeledQuestion>(&questions)?.into_iter().map(|q| q.q).collect();
            let rows = evaluate(&pipeline, &questions, k.unwrap_or_else(|| pipeline.default_k()))?;
            let out = out.unwrap_or_else(|| config.resolve("data/eval.csv"));
            if let Some(parent) = out.parent() { std::fs::create_dir_all(parent)?; }
            let mut file = std::io::BufWriter::new(std::fs::File::create(&out)?);
            write_csv(&mut file, &rows)?;
            println!("Wrote {} rows to {}", rows.len(), out.display());
            Ok(())
        }
    }
}

fn ingest(config: &Config, settings: &Settings, raw_dir: Option<PathBuf>) -> Result<()> {
    let raw_dir = raw_dir.unwrap_or_else(|| config.resolve(&settings.paths.raw_text_dir));
    let manifest = config.resolve(&settings.paths.sources_manifest);
    info!(dir = %raw_dir.display(), manifest = %manifest.display(), "ingesting");
    let corpus = SqliteCorpus::open(&config.resolve(&settings.paths.corpus_db))?;
    let chunking = ChunkingConfig { max_chars: settings.ingest.max_chars, overlap_chars: settings.ingest.overlap_chars };
    let report = ingest_directory(&corpus, &raw_dir, Some(&manifest), chunking)?;
    println!("Ingested {} documents into {} chunks ({} skipped)", report.documents, report.chunks, report.skipped);
    Ok(())
}

fn build_index(config: &Config, settings: &Settings) -> Result<()> {
    let paths = &settings.paths;
    let corpus = SqliteCorpus::open(&config.resolve(&paths.corpus_db))?;
    let chunks = corpus.all_chunks()?;
    if chunks.is_empty() {
        warn!("corpus is empty; run `citeqa ingest` first");
        anyhow::bail!("no chunks to index");
    }

    let lexical = TantivyLexicalIndex::create(&config.resolve(&paths.lexical_index_dir))?;
    let n = lexical.index_chunks(&chunks)?;
    println!("Indexed {} chunks into Tantivy", n);

    let embedder = get_default_embedder(&config.resolve(&paths.embed_model_dir))?;
    let report = build_vector_index(
        embedder.as_ref(),
        &chunks,
        &config.resolve(&paths.vector_db_dir),
        &paths.vector_table,
        &config.resolve(&paths.id_mapping),
    )?;
    println!(
        "Indexed {} vectors (dim {}) into LanceDB{}",
        report.rows,
        report.dim,
        if report.ann_index { " with IVF_PQ" } else { "" }
    );
    Ok(())
}
