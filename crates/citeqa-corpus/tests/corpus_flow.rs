use std::path::PathBuf;

use proptest::prelude::*;
use tempfile::TempDir;

use citeqa_core::text::split_sentences;
use citeqa_core::traits::CorpusStore;
use citeqa_corpus::chunker::{chunk_text, ChunkingConfig};
use citeqa_corpus::ingest::discover_sources;
use citeqa_corpus::{ingest_directory, SqliteCorpus};

fn test_data() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap().join("test_data")
}

#[test]
fn manifest_ingestion_skips_missing_sources() {
    let tmp = TempDir::new().unwrap();
    let corpus = SqliteCorpus::open(&tmp.path().join("chunks.db")).unwrap();
    let data = test_data();
    let report = ingest_directory(&corpus, &data.join("txt"), Some(&data.join("sources.json")), ChunkingConfig::default()).unwrap();
    assert_eq!(report.documents, 3);
    assert_eq!(report.skipped, 1, "retired_policy.txt is listed but absent");
    assert_eq!(report.chunks, corpus.chunk_count().unwrap());

    let docs = corpus.documents().unwrap();
    assert_eq!(docs[0].title, "Workshop Eye Safety");
    assert_eq!(docs[0].url, "https://example.org/eye-safety");

    let chunks = corpus.all_chunks().unwrap();
    let ids: Vec<i64> = chunks.iter().map(|c| c.chunk_id).collect();
    let texts = corpus.chunk_texts(&ids).unwrap();
    assert_eq!(texts.len(), chunks.len());
    assert!(texts[&chunks[0].chunk_id].starts_with("Eye protection is mandatory."));
    for c in &chunks {
        assert_eq!(c.content_hash, blake3::hash(c.text.as_bytes()).to_hex().to_string());
    }

    let meta = corpus.doc_meta(&[chunks[0].chunk_id, 9999]).unwrap();
    assert_eq!(meta.len(), 1, "unknown ids are absent");
    assert_eq!(meta[&chunks[0].chunk_id].title, "Workshop Eye Safety");
}

#[test]
fn reingestion_replaces_previous_corpus() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("chunks.db");
    let corpus = SqliteCorpus::open(&db).unwrap();
    let raw = test_data().join("txt");
    let first = ingest_directory(&corpus, &raw, None, ChunkingConfig::default()).unwrap();
    let second = ingest_directory(&corpus, &raw, None, ChunkingConfig::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(corpus.chunk_count().unwrap(), second.chunks);
    assert_eq!(corpus.all_chunks().unwrap()[0].chunk_id, 1);
    drop(corpus);

    let reader = SqliteCorpus::open_read_only(&db).unwrap();
    assert_eq!(reader.documents().unwrap().len(), 3);
    assert!(reader.insert_document("x.txt", "x", "").is_err(), "read-only handle rejects writes");
}

#[test]
fn discovery_without_manifest_uses_file_stems() {
    let sources = discover_sources(&test_data().join("txt"));
    let titles: Vec<&str> = sources.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["eye_safety", "fire_procedures", "incident_reporting"]);
    assert!(sources.iter().all(|s| s.url.is_empty()));
}

#[test]
fn in_memory_lookups_batch_large_id_lists() {
    let corpus = SqliteCorpus::open_in_memory().unwrap();
    let doc = corpus.insert_document("a.txt", "A", "").unwrap();
    let texts: Vec<String> = (0..1200).map(|i| format!("Sentence number {i}.")).collect();
    let chunks = corpus.insert_chunks(doc, &texts).unwrap();
    let ids: Vec<i64> = chunks.iter().map(|c| c.chunk_id).collect();
    assert_eq!(corpus.chunk_texts(&ids).unwrap().len(), 1200);
    assert!(corpus.chunk_texts(&[]).unwrap().is_empty());
}

proptest! {
    #[test]
    fn every_sentence_lands_in_a_chunk(words in prop::collection::vec("[a-z]{1,12}", 1..60), max in 20usize..200) {
        let text: String = words.iter().map(|w| format!("{w}.")).collect::<Vec<_>>().join(" ");
        let config = ChunkingConfig { max_chars: max, overlap_chars: max / 4 };
        let chunks = chunk_text(&text, config);
        for sentence in split_sentences(&text) {
            prop_assert!(chunks.iter().any(|c| c.contains(sentence)));
        }
        for c in &chunks {
            prop_assert!(c.chars().count() < max || split_sentences(c).len() == 1);
        }
    }
}
