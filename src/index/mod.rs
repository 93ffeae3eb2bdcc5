//! Search index clients
//!
//! `IndexClient` hides the vector search backend from the ingestion job and
//! the query pipeline. Three implementations:
//! - `ElasticIndex`: Elasticsearch REST API (dense_vector + knn search)
//! - `QdrantIndex`: Qdrant collections via qdrant-client
//! - `MemoryIndex`: exact cosine search in process, for tests and demos
//!
//! Every backend validates vector lengths against its configured dims before
//! any network round trip.

pub mod elastic;
pub mod memory;
pub mod qdrant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{IndexBackend, IndexConfig};
use crate::errors::{RagError, Result};
use crate::types::{PatentRecord, SearchHit};

pub use elastic::ElasticIndex;
pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;

/// Name of the vector field in every schema
pub const VECTOR_FIELD: &str = "embedding";

/// Fields the query pipeline asks for
pub const RETURNED_FIELDS: [&str; 3] = ["title", "abstract", "url"];

/// Outcome of `ensure_schema`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaStatus {
    Created,
    AlreadyExists,
}

/// Parameters of one approximate k-NN search
#[derive(Debug, Clone, PartialEq)]
pub struct KnnQuery {
    pub vector: Vec<f32>,
    pub k: usize,
    /// Candidate pool per shard/segment; trades recall for latency
    pub num_candidates: usize,
    pub fields: Vec<String>,
}

impl KnnQuery {
    /// Build a query returning `RETURNED_FIELDS`; the pool is never smaller than `k`
    pub fn new(vector: Vec<f32>, k: usize, num_candidates: usize) -> Self {
        Self {
            vector,
            k,
            num_candidates: num_candidates.max(k),
            fields: RETURNED_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Search backend operations used by ingestion and retrieval
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Vector length this client was configured for
    fn dims(&self) -> usize;

    /// Create the index with the patent schema if absent; never drops data
    async fn ensure_schema(&self, index: &str, dims: usize) -> Result<SchemaStatus>;

    /// Write one record; duplicates are allowed
    async fn upsert(&self, index: &str, record: &PatentRecord) -> Result<()>;

    /// Up to `query.k` hits ordered by descending similarity
    async fn knn_search(&self, index: &str, query: &KnnQuery) -> Result<Vec<SearchHit>>;

    /// Make recent writes visible to search
    async fn refresh(&self, _index: &str) -> Result<()> {
        Ok(())
    }

    /// Vector dims of an existing index, `None` when the index is absent
    async fn index_dims(&self, index: &str) -> Result<Option<usize>>;

    /// Backend reachability
    async fn health_check(&self) -> Result<()>;
}

/// Existing dims must equal the requested dims
pub(crate) fn check_existing_dims(existing: Option<usize>, dims: usize) -> Result<()> {
    match existing {
        Some(found) if found != dims => Err(RagError::DimensionMismatch {
            expected: found,
            actual: dims,
        }),
        _ => Ok(()),
    }
}

/// Build the configured backend
pub async fn connect(config: &IndexConfig) -> Result<Arc<dyn IndexClient>> {
    let client: Arc<dyn IndexClient> = match config.backend {
        IndexBackend::Elasticsearch => Arc::new(ElasticIndex::new(config)?),
        IndexBackend::Qdrant => Arc::new(QdrantIndex::new(config)?),
        IndexBackend::Memory => Arc::new(MemoryIndex::new(config.dims)),
    };
    Ok(client)
}
