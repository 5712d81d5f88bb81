use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use ragchat_core::error::Result;
use ragchat_core::traits::Embedder;
use ragchat_core::types::Vector;

use crate::check_input;

/// Deterministic feature-hashing embedder.
///
/// Lowercased word unigrams and padded character trigrams are hashed with
/// xxHash64 into `dim` buckets, signed by a second hash bit, then the vector is
/// L2-normalized. Texts sharing words or word stems land close together, which
/// is enough for offline use and tests; it is not a semantic model.
pub struct HashingEmbedder {
    dim: usize,
    max_input_chars: usize,
    id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize, max_input_chars: usize) -> Self {
        Self { dim, max_input_chars, id: format!("hashing:d{dim}") }
    }

    pub fn embed_sync(&self, text: &str) -> Result<Vector> {
        check_input(text, self.max_input_chars)?;
        let mut v = vec![0f32; self.dim];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let word = word.to_lowercase();
            self.add_feature(&mut v, &word, 1.0);
            let padded: Vec<char> = format!("#{word}#").chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.add_feature(&mut v, &gram, 0.5);
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }

    fn add_feature(&self, v: &mut [f32], feature: &str, weight: f32) {
        let mut hasher = XxHash64::with_seed(0);
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let idx = (h % self.dim as u64) as usize;
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        v[idx] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    async fn embed(&self, text: &str) -> Result<Vector> {
        self.embed_sync(text)
    }
}
