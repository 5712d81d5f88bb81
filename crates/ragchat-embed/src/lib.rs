//! ragchat-embed
//!
//! Embedder implementations behind `ragchat_core::traits::Embedder`:
//! a deterministic hashing embedder (default), an OpenAI-compatible HTTP
//! client, and, with the `candle` feature, a local BGE-M3 model.

use std::sync::Arc;

use ragchat_core::config::EmbeddingSettings;
use ragchat_core::error::{Error, Result};
use ragchat_core::traits::Embedder;

pub mod hashing;
pub mod http;

#[cfg(feature = "candle")]
pub mod bge;
#[cfg(feature = "candle")]
mod device;
#[cfg(feature = "candle")]
pub mod pool;
#[cfg(feature = "candle")]
mod tokenize;

#[cfg(feature = "candle")]
pub use bge::BgeEmbedder;
pub use hashing::HashingEmbedder;
pub use http::HttpEmbedder;
#[cfg(feature = "candle")]
pub use pool::masked_mean_l2;

/// Reject input every backend refuses: blank text or text over the length limit.
pub(crate) fn check_input(text: &str, max_input_chars: usize) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::Embedding("input text is empty".into()));
    }
    let len = text.chars().count();
    if len > max_input_chars {
        return Err(Error::Embedding(format!("input is {len} characters, limit is {max_input_chars}")));
    }
    Ok(())
}

fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Build the embedder selected by `settings.backend`.
///
/// `APP_USE_FAKE_EMBEDDINGS=1` forces the hashing embedder regardless of backend.
pub fn embedder_from_settings(settings: &EmbeddingSettings) -> anyhow::Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() {
        tracing::info!("APP_USE_FAKE_EMBEDDINGS set, using hashing embedder");
        return Ok(Arc::new(HashingEmbedder::new(settings.dim, settings.max_input_chars)));
    }
    match settings.backend.as_str() {
        "hashing" => Ok(Arc::new(HashingEmbedder::new(settings.dim, settings.max_input_chars))),
        "http" => Ok(Arc::new(HttpEmbedder::new(
            &settings.endpoint,
            &settings.model,
            settings.dim,
            settings.max_input_chars,
        ))),
        #[cfg(feature = "candle")]
        "bge" => Ok(Arc::new(BgeEmbedder::new(settings.max_input_chars)?)),
        #[cfg(not(feature = "candle"))]
        "bge" => Err(anyhow::anyhow!("embedding backend 'bge' requires the `candle` feature")),
        other => Err(Error::InvalidConfig(format!("unknown embedding backend '{other}'")).into()),
    }
}
