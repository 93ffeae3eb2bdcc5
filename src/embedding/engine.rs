// Embedding Engine - local sentence embeddings via Candle
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::Deserialize;
use std::path::PathBuf;
use tokenizers::{Tokenizer, TruncationParams};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info};

use crate::config::EmbeddingConfig;
use crate::embedding::{Embedder, OverflowPolicy};
use crate::errors::{RagError, Result};

/// Organisation prefixed to bare model names like `all-MiniLM-L6-v2`
const DEFAULT_MODEL_ORG: &str = "sentence-transformers";

/// Shape fields read straight from `config.json`
#[derive(Debug, Deserialize)]
struct ModelShape {
    hidden_size: usize,
    #[serde(default = "default_max_positions")]
    max_position_embeddings: usize,
}

fn default_max_positions() -> usize {
    512
}

/// BERT-family sentence embedder (mean pooling, optional L2 normalisation)
pub struct EmbeddingEngine {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dimension: usize,
    token_limit: usize,
    normalize: bool,
    on_overflow: OverflowPolicy,
}

impl EmbeddingEngine {
    /// Download (or reuse the cached copy of) the configured model and load it
    pub fn load(config: &EmbeddingConfig) -> Result<Self> {
        let device = Device::Cpu;
        let model_id = resolve_model_id(&config.model);
        info!(model = %model_id, "Loading embedding model");

        let api = Api::new().map_err(|e| {
            RagError::Embedding(format!("Failed to create HuggingFace API client: {}", e))
        })?;
        let repo = api.repo(Repo::new(model_id.clone(), RepoType::Model));

        let fetch = |file: &str| -> Result<PathBuf> {
            repo.get(file).map_err(|e| {
                RagError::Embedding(format!("Failed to download {} for {}: {}", file, model_id, e))
            })
        };

        let config_path = fetch("config.json")?;
        let tokenizer_path = fetch("tokenizer.json")?;

        let config_contents = std::fs::read_to_string(&config_path).map_err(|e| {
            RagError::Embedding(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        let (bert_config, shape) = parse_model_config(&config_contents)?;

        let token_limit = config.max_input_tokens.min(shape.max_position_embeddings);

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| RagError::Embedding(format!("Failed to load tokenizer: {}", e)))?;
        let truncation = match config.on_overflow {
            OverflowPolicy::Truncate => Some(TruncationParams {
                max_length: token_limit,
                ..Default::default()
            }),
            OverflowPolicy::Reject => None,
        };
        tokenizer
            .with_truncation(truncation)
            .map_err(|e| RagError::Embedding(format!("Failed to configure tokenizer: {}", e)))?;

        let vb = match fetch("model.safetensors") {
            Ok(weights_path) => unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
            },
            Err(_) => {
                let weights_path = fetch("pytorch_model.bin")?;
                VarBuilder::from_pth(weights_path, DType::F32, &device)
            }
        }
        .map_err(|e| RagError::Embedding(format!("Failed to load model weights: {}", e)))?;

        let model = BertModel::load(vb, &bert_config)
            .map_err(|e| RagError::Embedding(format!("Failed to create BERT model: {}", e)))?;

        info!(model = %model_id, dims = shape.hidden_size, "Embedding model ready");

        Ok(Self {
            model,
            tokenizer,
            device,
            model_id,
            dimension: shape.hidden_size,
            token_limit,
            normalize: config.normalize,
            on_overflow: config.on_overflow,
        })
    }

    /// Generate embedding for a single text
    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| RagError::Embedding(format!("Tokenization failed: {}", e)))?;

        let ids = encoding.get_ids();
        if self.on_overflow == OverflowPolicy::Reject && ids.len() > self.token_limit {
            return Err(RagError::Embedding(format!(
                "input is {} tokens, model limit is {}",
                ids.len(),
                self.token_limit
            )));
        }
        debug!(tokens = ids.len(), "Embedding text");

        self.forward(ids, encoding.get_attention_mask())
            .map_err(|e| RagError::Embedding(format!("Model inference failed: {}", e)))
    }

    fn forward(&self, ids: &[u32], mask: &[u32]) -> candle_core::Result<Vec<f32>> {
        let token_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = token_ids.zeros_like()?;
        let attention_mask = Tensor::new(mask, &self.device)?.unsqueeze(0)?;

        let embeddings = self
            .model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))?;

        let mut pooled = Self::mean_pool(&embeddings, &attention_mask)?;
        if self.normalize {
            pooled = Self::l2_normalize(&pooled)?;
        }

        pooled.squeeze(0)?.to_vec1::<f32>()
    }

    /// Mean pooling with attention mask
    fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        let mask_expanded = attention_mask
            .unsqueeze(2)?
            .expand(embeddings.shape())?
            .to_dtype(embeddings.dtype())?;

        let sum_embeddings = (embeddings * &mask_expanded)?.sum(1)?;
        let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;

        sum_embeddings.broadcast_div(&sum_mask)
    }

    fn l2_normalize(pooled: &Tensor) -> candle_core::Result<Tensor> {
        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
        pooled.broadcast_div(&norm)
    }
}

#[async_trait]
impl Embedder for EmbeddingEngine {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        run_blocking(|| self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

/// Parse `config.json` into the candle config plus the shape fields we read ourselves
fn parse_model_config(contents: &str) -> Result<(Config, ModelShape)> {
    let bert_config: Config = serde_json::from_str(contents)
        .map_err(|e| RagError::Embedding(format!("Failed to parse model config: {}", e)))?;
    let shape: ModelShape = serde_json::from_str(contents)
        .map_err(|e| RagError::Embedding(format!("Failed to parse model shape: {}", e)))?;
    Ok((bert_config, shape))
}

/// Hand the worker's other tasks off while a forward pass runs; current_thread runtimes run inline
fn run_blocking<T>(work: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

/// `all-MiniLM-L6-v2` -> `sentence-transformers/all-MiniLM-L6-v2`; ids with an org pass through
pub fn resolve_model_id(name: &str) -> String {
    let name = name.trim();
    if name.contains('/') {
        name.to_string()
    } else {
        format!("{}/{}", DEFAULT_MODEL_ORG, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_id() {
        assert_eq!(
            resolve_model_id("all-MiniLM-L6-v2"),
            "sentence-transformers/all-MiniLM-L6-v2"
        );
        assert_eq!(
            resolve_model_id("BAAI/bge-small-en-v1.5"),
            "BAAI/bge-small-en-v1.5"
        );
    }

    #[test]
    fn test_model_shape_defaults_positions() {
        let shape: ModelShape = serde_json::from_str(r#"{"hidden_size": 384}"#).unwrap();
        assert_eq!(shape.hidden_size, 384);
        assert_eq!(shape.max_position_embeddings, 512);
    }

    #[test]
    fn test_unreadable_model_config_is_embedding_error() {
        for contents in ["not json", r#"{"hidden_size": "wide"}"#] {
            match parse_model_config(contents) {
                Err(RagError::Embedding(msg)) => assert!(msg.contains("model config")),
                Err(other) => panic!("unexpected error: {:?}", other),
                Ok(_) => panic!("config should not parse: {}", contents),
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_blocking_on_multi_thread_runtime() {
        let value = run_blocking(|| (1..=4).sum::<u32>());
        assert_eq!(value, 10);
    }

    #[tokio::test]
    async fn test_run_blocking_on_current_thread_runtime() {
        assert_eq!(run_blocking(|| "inline"), "inline");
    }

    #[test]
    fn test_run_blocking_outside_runtime() {
        assert_eq!(run_blocking(|| 7), 7);
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_embedding_dimension() {
        let engine = EmbeddingEngine::load(&EmbeddingConfig::default()).expect("Failed to load engine");
        assert_eq!(engine.dimension(), 384);
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_embed_is_deterministic_and_normalized() {
        let engine = EmbeddingEngine::load(&EmbeddingConfig::default()).expect("Failed to load engine");
        let a = engine.embed_sync("gesture control in AR").expect("Failed to embed");
        let b = engine.embed_sync("gesture control in AR").expect("Failed to embed");
        assert_eq!(a, b);
        assert_eq!(a.len(), 384);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_embed_empty_text() {
        let engine = EmbeddingEngine::load(&EmbeddingConfig::default()).expect("Failed to load engine");
        let embedding = engine.embed_sync("").expect("Empty text should embed");
        assert_eq!(embedding.len(), 384);
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_reject_policy_fails_on_long_input() {
        let config = EmbeddingConfig {
            max_input_tokens: 8,
            on_overflow: OverflowPolicy::Reject,
            ..Default::default()
        };
        let engine = EmbeddingEngine::load(&config).expect("Failed to load engine");
        let long = "wearable glove ".repeat(50);
        assert!(matches!(engine.embed_sync(&long), Err(RagError::Embedding(_))));
    }
}
