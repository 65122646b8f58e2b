use std::path::Path;

use citeqa_core::traits::{Embedder, PairScorer};
use citeqa_embed::{get_default_embedder, FakeEmbedder, FakePairScorer};

fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[test]
fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid loading large model
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let embedder = get_default_embedder(Path::new("models/does-not-exist")).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), embedder.dim());
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_prefers_shared_tokens() {
    let e = FakeEmbedder::new(256);
    let q = e.embed("Is eye protection required?").unwrap();
    let near = e.embed("Eye protection is mandatory.").unwrap();
    let far = e.embed("Report incidents to the supervisor.").unwrap();
    assert!(cosine(&q, &near) > cosine(&q, &far));
    let empty = e.embed("?!").unwrap();
    assert!(empty.iter().all(|x| *x == 0.0), "no tokens gives the zero vector");
}

#[test]
fn fake_pair_scorer_is_bounded_and_ordered() {
    let scores = FakePairScorer
        .score_pairs("eye protection", &["Eye protection is mandatory.", "Wear gloves.", "eye wash"])
        .unwrap();
    assert_eq!(scores, vec![1.0, 0.0, 0.5]);
    assert!(FakePairScorer.score_pairs("eye", &[]).unwrap().is_empty());
}

#[test]
fn sigmoid_maps_logits_into_unit_interval() {
    use citeqa_core::score::sigmoid;
    assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
    assert!(sigmoid(8.0) > 0.99 && sigmoid(-8.0) < 0.01);
}
