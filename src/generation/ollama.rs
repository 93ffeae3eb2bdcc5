//! Ollama chat client
//!
//! Non-streaming POST /api/chat against a local or remote Ollama server.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::errors::{RagError, Result};
use crate::generation::Generator;
use crate::types::ChatMessage;

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Ollama chat client
#[derive(Debug, Clone)]
pub struct OllamaChat {
    client: Client,
    base_url: String,
    model: String,
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

impl OllamaChat {
    /// Create client; the OpenAI default base URL is swapped for the local Ollama one
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Generation(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = if config.base_url == GenerationConfig::default().base_url {
            DEFAULT_OLLAMA_URL.to_string()
        } else {
            config.base_url.trim_end_matches('/').to_string()
        };

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Generator for OllamaChat {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Generation(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::Generation(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| RagError::Generation(format!("Malformed response: {}", e)))?;

        match parsed.message {
            Some(message) if !message.content.trim().is_empty() => Ok(message.content),
            _ => Err(RagError::Generation("Completion was empty".to_string())),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}
