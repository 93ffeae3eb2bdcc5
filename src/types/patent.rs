//! Patent records and search hits
//!
//! `PatentSource` is what the ingestion input file holds, `PatentRecord` is
//! what gets written to the index, and `SearchHit` is what comes back out.

use serde::{Deserialize, Serialize};

use crate::errors::{RagError, Result};

/// One row of the ingestion input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentSource {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PatentSource {
    /// Text fed to the embedder: title and abstract joined by one space
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }

    /// Attach an embedding, producing the record stored in the index
    pub fn into_record(self, embedding: Vec<f32>) -> PatentRecord {
        PatentRecord {
            title: self.title,
            abstract_text: self.abstract_text,
            url: self.url,
            embedding,
        }
    }
}

/// A patent plus its dense embedding, as stored in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentRecord {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub embedding: Vec<f32>,
}

impl PatentRecord {
    /// Stored url; missing urls are written as the empty string
    pub fn url_or_empty(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }

    /// Fail unless the embedding has exactly `dims` components
    pub fn check_dims(&self, dims: usize) -> Result<()> {
        check_vector_dims(&self.embedding, dims)
    }
}

/// Ranked result of a k-NN search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub score: f32,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub url: String,
}

impl SearchHit {
    /// Map a loosely typed backend document into a hit.
    ///
    /// `title` and `abstract` must be present strings; a missing or
    /// non-string `url` becomes `""`.
    pub fn from_source(score: f32, source: &serde_json::Value) -> Result<Self> {
        let field = |name: &str| {
            source
                .get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        let title = field("title")
            .ok_or_else(|| RagError::IndexUnavailable("malformed hit: missing title".to_string()))?;
        let abstract_text = field("abstract").ok_or_else(|| {
            RagError::IndexUnavailable("malformed hit: missing abstract".to_string())
        })?;

        Ok(Self {
            score,
            title,
            abstract_text,
            url: field("url").unwrap_or_default(),
        })
    }
}

/// A single user query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub top_k: usize,
}

impl Query {
    pub fn new(text: impl Into<String>, top_k: usize) -> Self {
        Self {
            text: text.into(),
            top_k,
        }
    }

    /// Reject blank text and `top_k` outside `[1, max_top_k]`
    pub fn validate(&self, max_top_k: usize) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(RagError::Validation("query text must not be empty".to_string()));
        }
        if self.top_k == 0 || self.top_k > max_top_k {
            return Err(RagError::Validation(format!(
                "top_k must be between 1 and {}, got {}",
                max_top_k, self.top_k
            )));
        }
        Ok(())
    }
}

/// Shared length check used by every index backend before touching the network
pub fn check_vector_dims(vector: &[f32], dims: usize) -> Result<()> {
    if vector.len() != dims {
        return Err(RagError::DimensionMismatch {
            expected: dims,
            actual: vector.len(),
        });
    }
    Ok(())
}
