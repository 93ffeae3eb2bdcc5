//! OpenAI-compatible chat completions client
//!
//! Endpoint: POST {base_url}/chat/completions, bearer auth.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::errors::{RagError, Result};
use crate::generation::Generator;
use crate::types::ChatMessage;

/// Chat client for OpenAI and API-compatible gateways
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiChat {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Generation(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl Generator for OpenAiChat {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = self.completions_url();
        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!(url = %url, model = %self.model, "Sending chat completion request");
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RagError::Generation(format!("Request timed out: {}", e))
            } else {
                RagError::Generation(format!("Failed to send request: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(&error_text) {
                return Err(RagError::Generation(format!(
                    "API error ({}): {}",
                    status, parsed.error.message
                )));
            }
            return Err(RagError::Generation(format!("HTTP {}: {}", status, error_text)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RagError::Generation(format!("Malformed response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::Generation("No choices in response".to_string()))?;

        if content.trim().is_empty() {
            return Err(RagError::Generation("Completion was empty".to_string()));
        }

        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url() {
        let config = GenerationConfig {
            base_url: "https://llm.example/v1/".to_string(),
            ..Default::default()
        };
        let chat = OpenAiChat::new(&config).unwrap();
        assert_eq!(chat.completions_url(), "https://llm.example/v1/chat/completions");
        assert_eq!(chat.model(), "gpt-4.1");
    }

    #[test]
    fn test_request_shape() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let request = ChatRequest {
            model: "gpt-4.1",
            messages: &messages,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4.1");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_response_without_content() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
