//! Error types for PatentWhisperer
//!
//! One error enum shared by the ingestion job and the query pipeline.
//! Every variant maps to a user-visible failure class.

use thiserror::Error;

/// Main error type for retrieval, generation and ingestion
#[derive(Error, Debug)]
pub enum RagError {
    /// Bad user input (empty query, top_k out of bounds)
    #[error("Invalid query: {0}")]
    Validation(String),

    /// Embedding model unavailable or input rejected
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// Search backend unreachable or returned an unusable answer
    #[error("Search index unavailable: {0}")]
    IndexUnavailable(String),

    /// Vector length disagrees with the index schema
    #[error("Embedding dimension mismatch: index expects {expected} dims, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Generative model call failed
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingestion input could not be read as patent records
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Caller-side deadline elapsed
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RagError {
    /// True for errors caused by the caller's input rather than a backend
    pub fn is_user_error(&self) -> bool {
        matches!(self, RagError::Validation(_))
    }

    /// True for failures of the retrieval half of the pipeline
    pub fn is_retrieval_error(&self) -> bool {
        matches!(
            self,
            RagError::Embedding(_) | RagError::IndexUnavailable(_) | RagError::DimensionMismatch { .. }
        )
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RagError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert!(err.to_string().contains("384"));
        assert!(err.to_string().contains("768"));
    }

    #[test]
    fn test_error_classes() {
        assert!(RagError::Validation("empty".into()).is_user_error());
        assert!(!RagError::Validation("empty".into()).is_retrieval_error());
        assert!(RagError::IndexUnavailable("down".into()).is_retrieval_error());
        assert!(RagError::Embedding("no model".into()).is_retrieval_error());
        assert!(!RagError::Generation("quota".into()).is_retrieval_error());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: RagError = io.into();
        assert!(err.to_string().contains("missing.json"));
    }
}
