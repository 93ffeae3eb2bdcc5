//! Configuration management for PatentWhisperer
//!
//! TOML file with built-in defaults, overridden by environment variables.
//! Location: ~/.patentwhisperer/config.toml (or `--config <PATH>`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::embedding::OverflowPolicy;
use crate::errors::{RagError, Result};
use crate::rag::context::TruncationStrategy;

/// Hard upper bound for the user-facing result count
pub const TOP_K_LIMIT: usize = 10;

const REDACTED: &str = "********";

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub query: QueryConfig,
}

/// Which search backend hosts the patent index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Elasticsearch,
    Qdrant,
    Memory,
}

/// Search backend connection and schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub name: String,
    pub dims: usize,
    pub num_candidates: usize,
    pub timeout_secs: u64,
}

/// Local embedding model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub max_input_tokens: usize,
    pub normalize: bool,
    pub on_overflow: OverflowPolicy,
}

/// Which chat-completion API answers questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationProvider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "ollama")]
    Ollama,
}

/// Generative model endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: GenerationProvider,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

/// Query pipeline limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub max_context_chars: usize,
    pub truncation: TruncationStrategy,
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Elasticsearch,
            url: "http://localhost:9200".to_string(),
            api_key: None,
            name: "patents".to_string(),
            dims: 384,
            num_candidates: 100,
            timeout_secs: 30,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            max_input_tokens: 256,
            normalize: true,
            on_overflow: OverflowPolicy::Truncate,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4.1".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: TOP_K_LIMIT,
            max_context_chars: 3000,
            truncation: TruncationStrategy::Characters,
            timeout_secs: 120,
        }
    }
}

impl FromStr for IndexBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elasticsearch" | "elastic" => Ok(Self::Elasticsearch),
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            other => Err(RagError::ConfigError(format!("Unknown index backend: {}", other))),
        }
    }
}

impl FromStr for GenerationProvider {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(RagError::ConfigError(format!(
                "Unknown generation provider: {}",
                other
            ))),
        }
    }
}

impl Config {
    /// Load configuration from file (or defaults), then apply environment overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(config_path) => Self::load_from_file(&config_path)?,
            None => Self::load_default()?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RagError::ConfigError(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents)
            .map_err(|e| RagError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Load from the standard location or fall back to built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// ~/.patentwhisperer/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".patentwhisperer").join("config.toml"))
    }

    /// Apply environment-style overrides.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PATENT_INDEX_BACKEND") {
            self.index.backend = v.parse()?;
        }
        if let Some(v) = get("ELASTIC_URL") {
            self.index.url = v;
        }
        if let Some(v) = get("ELASTIC_API_KEY") {
            self.index.api_key = Some(v);
        }
        if let Some(v) = get("ELASTIC_INDEX") {
            self.index.name = v;
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = get("PATENT_GENERATION_PROVIDER") {
            self.generation.provider = v.parse()?;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.generation.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_API_BASE") {
            self.generation.base_url = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.generation.model = v;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.index.name.trim().is_empty() {
            return Err(RagError::ConfigError("index.name must not be empty".to_string()));
        }

        if self.index.dims == 0 {
            return Err(RagError::ConfigError(
                "index.dims must be greater than 0".to_string(),
            ));
        }

        if self.query.max_top_k == 0 || self.query.max_top_k > TOP_K_LIMIT {
            return Err(RagError::ConfigError(format!(
                "query.max_top_k must be between 1 and {}",
                TOP_K_LIMIT
            )));
        }

        if self.query.default_top_k == 0 || self.query.default_top_k > self.query.max_top_k {
            return Err(RagError::ConfigError(
                "query.default_top_k must be between 1 and query.max_top_k".to_string(),
            ));
        }

        if self.index.num_candidates < self.query.max_top_k {
            return Err(RagError::ConfigError(
                "index.num_candidates must be at least query.max_top_k".to_string(),
            ));
        }

        if self.query.max_context_chars == 0 {
            return Err(RagError::ConfigError(
                "query.max_context_chars must be greater than 0".to_string(),
            ));
        }

        if self.embedding.max_input_tokens == 0 {
            return Err(RagError::ConfigError(
                "embedding.max_input_tokens must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Copy with API keys masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.index.api_key.is_some() {
            copy.index.api_key = Some(REDACTED.to_string());
        }
        if copy.generation.api_key.is_some() {
            copy.generation.api_key = Some(REDACTED.to_string());
        }
        copy
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| RagError::ConfigError(format!("Failed to serialize config: {}", e)))
    }
}
