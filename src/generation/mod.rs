//! Answer generation
//!
//! `Generator` turns a system + user message pair into one completion.
//! Backends: OpenAI-compatible chat completions and Ollama's chat API.

pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{GenerationConfig, GenerationProvider};
use crate::errors::Result;
use crate::types::ChatMessage;

pub use ollama::OllamaChat;
pub use openai::OpenAiChat;

/// Chat-completion backend
#[async_trait]
pub trait Generator: Send + Sync {
    /// One completion for the given messages; any failure is `RagError::Generation`
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Model identifier
    fn model(&self) -> &str;
}

/// Build the configured backend
pub fn connect(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    let generator: Arc<dyn Generator> = match config.provider {
        GenerationProvider::OpenAi => Arc::new(OpenAiChat::new(config)?),
        GenerationProvider::Ollama => Arc::new(OllamaChat::new(config)?),
    };
    Ok(generator)
}
