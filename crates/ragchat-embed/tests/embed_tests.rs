use ragchat_core::config::EmbeddingSettings;
use ragchat_core::error::Error;
use ragchat_core::traits::Embedder;
use ragchat_embed::{embedder_from_settings, HashingEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[tokio::test]
async fn hashing_embedder_shapes_and_determinism() {
    let embedder = embedder_from_settings(&EmbeddingSettings::default()).expect("embedder");
    let v1 = embedder.embed("hello world").await.expect("embed");
    let v2 = embedder.embed("hello world").await.expect("embed");

    assert_eq!(v1.len(), 384, "default embedding dim is 384");
    assert_eq!(embedder.dim(), 384);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[tokio::test]
async fn shared_words_score_higher_than_unrelated_text() {
    let embedder = HashingEmbedder::new(512, 1000);
    let q = embedder.embed("banana bread recipe").await.unwrap();
    let near = embedder.embed("a recipe for banana bread").await.unwrap();
    let far = embedder.embed("car engine repair").await.unwrap();
    assert!(cosine(&q, &near) > cosine(&q, &far));
    assert!(cosine(&q, &near) > 0.5);
}

#[tokio::test]
async fn empty_and_oversized_input_are_rejected() {
    let embedder = HashingEmbedder::new(16, 10);
    assert!(matches!(embedder.embed("").await, Err(Error::Embedding(_))));
    assert!(matches!(embedder.embed("   \n").await, Err(Error::Embedding(_))));
    assert!(matches!(embedder.embed("eleven chars").await, Err(Error::Embedding(_))));
    assert!(embedder.embed("ten chars!").await.is_ok());
}

#[test]
fn unknown_backend_is_rejected() {
    let settings = EmbeddingSettings { backend: "word2vec".into(), ..EmbeddingSettings::default() };
    // only meaningful when the fake override is not forcing the hashing backend
    if std::env::var("APP_USE_FAKE_EMBEDDINGS").is_err() {
        assert!(embedder_from_settings(&settings).is_err());
    }
}
