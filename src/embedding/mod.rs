//! Text embedding
//!
//! The `Embedder` trait is the seam the pipeline and the ingestion job
//! depend on; `EmbeddingEngine` is the local candle-backed implementation.

pub mod engine;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub use engine::EmbeddingEngine;

/// What to do with inputs longer than the model's token limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Silently cut the token sequence at the limit
    Truncate,
    /// Fail with an embedding error
    Reject,
}

/// Maps text to a fixed-length dense vector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text. Same input and model version give the same vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;

    /// Model identifier, for logs and diagnostics
    fn model_name(&self) -> &str;
}
