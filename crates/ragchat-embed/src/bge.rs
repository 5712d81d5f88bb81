//! Local BGE-M3 (XLM-RoBERTa) embedder running on candle.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use ragchat_core::error::{Error, Result};
use ragchat_core::traits::Embedder;
use ragchat_core::types::Vector;

use crate::check_input;
use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

const MAX_TOKENS: usize = 256;

struct BgeModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl BgeModel {
    fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let device = select_device();
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let weights_path = model_dir.join("pytorch_model.bin");
        tracing::info!(weights = %weights_path.display(), "loading BGE-M3 weights");
        let weights: HashMap<String, Tensor> = candle_core::pickle::read_all(&weights_path)?.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        Ok(Self { model, tokenizer, device })
    }

    fn embed_blocking(&self, text: &str) -> anyhow::Result<Vector> {
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, MAX_TOKENS, &self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_TOKENS), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?)
    }
}

pub struct BgeEmbedder {
    inner: Arc<BgeModel>,
    dim: usize,
    max_input_chars: usize,
    id: String,
}

impl BgeEmbedder {
    pub fn new(max_input_chars: usize) -> anyhow::Result<Self> {
        let model_dir = resolve_model_dir()?;
        let inner = Arc::new(BgeModel::load(&model_dir)?);
        let dim = inner.embed_blocking("dimension check")?.len();
        tracing::info!(dim, "BGE-M3 model loaded");
        Ok(Self { inner, dim, max_input_chars, id: format!("bge-m3:d{dim}") })
    }
}

#[async_trait]
impl Embedder for BgeEmbedder {
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
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || inner.embed_blocking(&text))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))?
            .map_err(|e| Error::Embedding(e.to_string()))
    }
}

fn resolve_model_dir() -> anyhow::Result<PathBuf> {
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() {
                tracing::info!(var, dir = %p.display(), "using model dir");
                return Ok(p);
            }
        }
    }
    for candidate in ["../models/bge-m3", "models/bge-m3"] {
        let p = Path::new(candidate);
        if p.exists() {
            return Ok(p.to_path_buf());
        }
    }
    Err(anyhow::anyhow!("Could not locate BGE-M3 model directory"))
}
