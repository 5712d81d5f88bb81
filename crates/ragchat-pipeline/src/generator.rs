//! Generator backends.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use ragchat_core::config::GenerationSettings;
use ragchat_core::error::{Error, Result};
use ragchat_core::traits::Generator;
use ragchat_core::types::Context;

pub const NO_CONTEXT_REPLY: &str = "I could not find anything relevant in the indexed documents.";

/// OpenAI-compatible chat completion client (LM Studio, llama.cpp server, vLLM, ...).
#[derive(Clone)]
pub struct OpenAiGenerator {
    base_url: String,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    client: Client,
}

impl OpenAiGenerator {
    pub fn new(settings: &GenerationSettings) -> Self {
        Self {
            base_url: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            client: Client::new(),
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = self.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
            if let Some(t) = self.temperature { obj.insert("temperature".to_string(), json!(t)); }
        }
        body
    }
}

/// Pull the assistant message out of a chat completion payload.
fn completion_text(payload: &Value) -> Result<String> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| strip_reasoning(s).to_string())
        .ok_or_else(|| Error::Generation("completion response has no message content".into()))
}

/// Reasoning models (DeepSeek R1 and friends) prefix answers with a
/// `<think>...</think>` block that is not part of the answer.
fn strip_reasoning(text: &str) -> &str {
    match text.find("</think>") {
        Some(end) if text.trim_start().starts_with("<think>") => text[end + "</think>".len()..].trim(),
        _ => text.trim(),
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| Error::Generation(format!("request to {url} failed: {e}")))?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("backend returned {status}: {text}")));
        }
        let payload: Value = res.json().await.map_err(|e| Error::Generation(format!("malformed response: {e}")))?;
        completion_text(&payload)
    }
}

/// Offline generator: answers with the highest ranked context passage.
///
/// Inside the pipeline it reads the passage from the `Context` directly, so
/// the prompt template layout does not matter. Given only a prompt it takes
/// the text after the `[1] (source: ...)` marker up to the `[2]` marker, or
/// to the end of the prompt when there is a single passage.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveGenerator;

const FIRST_MARKER: &str = "[1] (source: ";
const SECOND_MARKER: &str = "[2] (source: ";

fn first_passage(prompt: &str) -> Option<&str> {
    let start = prompt.find(FIRST_MARKER)?;
    let after_marker = &prompt[start..];
    let body = &after_marker[after_marker.find('\n')? + 1..];
    let end = body.find(SECOND_MARKER).unwrap_or(body.len());
    Some(body[..end].trim()).filter(|p| !p.is_empty())
}

#[async_trait]
impl Generator for ExtractiveGenerator {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(first_passage(prompt).unwrap_or(NO_CONTEXT_REPLY).to_string())
    }

    async fn generate_grounded(&self, _prompt: &str, context: &Context) -> Result<String> {
        Ok(context
            .passages
            .first()
            .map_or(NO_CONTEXT_REPLY, |p| p.document.text.trim())
            .to_string())
    }
}
