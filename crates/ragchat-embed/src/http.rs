//! OpenAI-compatible `/v1/embeddings` client (Ollama, LM Studio, vLLM, ...).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use ragchat_core::error::{Error, Result};
use ragchat_core::traits::Embedder;
use ragchat_core::types::Vector;

use crate::check_input;

#[derive(Clone)]
pub struct HttpEmbedder {
    base_url: String,
    model: String,
    dim: usize,
    max_input_chars: usize,
    id: String,
    client: Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(base_url: &str, model: &str, dim: usize, max_input_chars: usize) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let id = format!("http:{model}:d{dim}");
        Self { base_url, model: model.to_string(), dim, max_input_chars, id, client: Client::new() }
    }

    fn url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    /// Pull the first embedding out of a response body and check its length.
    pub(crate) fn parse_response(&self, body: &str) -> Result<Vector> {
        let response: EmbeddingResponse =
            serde_json::from_str(body).map_err(|e| Error::Embedding(format!("malformed embeddings response: {e}")))?;
        let vector = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Embedding("embeddings response has no data".into()))?;
        if vector.len() != self.dim {
            return Err(Error::Embedding(format!(
                "backend returned {} dimensions, expected {}",
                vector.len(),
                self.dim
            )));
        }
        Ok(vector)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
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
        check_input(text, self.max_input_chars)?;
        let body = EmbeddingRequest { model: &self.model, input: vec![text] };
        let res = self
            .client
            .post(self.url())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("request to {} failed: {e}", self.base_url)))?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!("embedding backend returned {status}: {text}")));
        }
        let payload = res.text().await.map_err(|e| Error::Embedding(e.to_string()))?;
        self.parse_response(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_embedding() {
        let e = HttpEmbedder::new("http://localhost:11434/", "m", 3, 100);
        assert_eq!(e.url(), "http://localhost:11434/v1/embeddings");
        let v = e.parse_response(r#"{"data":[{"embedding":[0.1,0.2,0.3],"index":0}],"model":"m"}"#).unwrap();
        assert_eq!(v, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn wrong_dimension_is_an_embedding_error() {
        let e = HttpEmbedder::new("http://x", "m", 4, 100);
        let err = e.parse_response(r#"{"data":[{"embedding":[0.1]}]}"#).unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        let err = e.parse_response(r#"{"data":[]}"#).unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }
}
