//! In-process index with exact cosine search
//!
//! Holds records for the lifetime of the process. Used by tests and for
//! offline demos; `num_candidates` is irrelevant since every record is scored.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::errors::{RagError, Result};
use crate::index::{check_existing_dims, IndexClient, KnnQuery, SchemaStatus};
use crate::types::patent::check_vector_dims;
use crate::types::{PatentRecord, SearchHit};

#[derive(Debug, Default)]
struct Collection {
    dims: usize,
    records: Vec<PatentRecord>,
}

/// Memory-backed patent index
#[derive(Debug)]
pub struct MemoryIndex {
    dims: usize,
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Number of records stored in `index` (0 if absent)
    pub async fn len(&self, index: &str) -> usize {
        self.collections
            .read()
            .await
            .get(index)
            .map(|c| c.records.len())
            .unwrap_or(0)
    }
}

/// Cosine similarity; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl IndexClient for MemoryIndex {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn ensure_schema(&self, index: &str, dims: usize) -> Result<SchemaStatus> {
        if dims != self.dims {
            return Err(RagError::DimensionMismatch {
                expected: self.dims,
                actual: dims,
            });
        }

        let mut collections = self.collections.write().await;
        if let Some(existing) = collections.get(index) {
            check_existing_dims(Some(existing.dims), dims)?;
            return Ok(SchemaStatus::AlreadyExists);
        }

        collections.insert(
            index.to_string(),
            Collection {
                dims,
                records: Vec::new(),
            },
        );
        Ok(SchemaStatus::Created)
    }

    async fn upsert(&self, index: &str, record: &PatentRecord) -> Result<()> {
        record.check_dims(self.dims)?;

        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(index)
            .ok_or_else(|| RagError::IndexUnavailable(format!("no such index: {}", index)))?;
        collection.records.push(record.clone());
        Ok(())
    }

    async fn knn_search(&self, index: &str, query: &KnnQuery) -> Result<Vec<SearchHit>> {
        check_vector_dims(&query.vector, self.dims)?;

        let collections = self.collections.read().await;
        let collection = collections
            .get(index)
            .ok_or_else(|| RagError::IndexUnavailable(format!("no such index: {}", index)))?;

        let mut scored: Vec<(f32, &PatentRecord)> = collection
            .records
            .iter()
            .map(|r| (cosine_similarity(&r.embedding, &query.vector), r))
            .collect();
        // Stable: equal scores keep insertion order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(query.k);

        Ok(scored
            .into_iter()
            .map(|(score, record)| SearchHit {
                score,
                title: record.title.clone(),
                abstract_text: record.abstract_text.clone(),
                url: record.url_or_empty().to_string(),
            })
            .collect())
    }

    async fn index_dims(&self, index: &str) -> Result<Option<usize>> {
        Ok(self.collections.read().await.get(index).map(|c| c.dims))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, embedding: Vec<f32>) -> PatentRecord {
        PatentRecord {
            title: title.to_string(),
            abstract_text: format!("{} abstract", title),
            url: None,
            embedding,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let index = MemoryIndex::new(2);
        assert_eq!(index.ensure_schema("patents", 2).await.unwrap(), SchemaStatus::Created);
        index.upsert("patents", &record("A", vec![1.0, 0.0])).await.unwrap();
        assert_eq!(
            index.ensure_schema("patents", 2).await.unwrap(),
            SchemaStatus::AlreadyExists
        );
        assert_eq!(index.len("patents").await, 1);
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let index = MemoryIndex::new(2);
        index.ensure_schema("patents", 2).await.unwrap();
        index.upsert("patents", &record("far", vec![0.0, 1.0])).await.unwrap();
        index.upsert("patents", &record("near", vec![1.0, 0.1])).await.unwrap();
        index.upsert("patents", &record("mid", vec![0.7, 0.7])).await.unwrap();

        let hits = index
            .knn_search("patents", &KnnQuery::new(vec![1.0, 0.0], 2, 100))
            .await
            .unwrap();
        let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["near", "mid"]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let index = MemoryIndex::new(2);
        index.ensure_schema("patents", 2).await.unwrap();
        index.upsert("patents", &record("first", vec![1.0, 0.0])).await.unwrap();
        index.upsert("patents", &record("second", vec![1.0, 0.0])).await.unwrap();

        let hits = index
            .knn_search("patents", &KnnQuery::new(vec![1.0, 0.0], 2, 100))
            .await
            .unwrap();
        assert_eq!(hits[0].title, "first");
        assert_eq!(hits[1].title, "second");
    }

    #[tokio::test]
    async fn test_dimension_checks() {
        let index = MemoryIndex::new(384);
        assert!(matches!(
            index.ensure_schema("patents", 768).await,
            Err(RagError::DimensionMismatch { expected: 384, actual: 768 })
        ));

        index.ensure_schema("patents", 384).await.unwrap();
        assert!(matches!(
            index.knn_search("patents", &KnnQuery::new(vec![0.1; 768], 1, 100)).await,
            Err(RagError::DimensionMismatch { expected: 384, actual: 768 })
        ));
        assert!(matches!(
            index.upsert("patents", &record("bad", vec![0.1; 3])).await,
            Err(RagError::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_index_is_unavailable() {
        let index = MemoryIndex::new(2);
        assert!(matches!(
            index.knn_search("nope", &KnnQuery::new(vec![1.0, 0.0], 1, 100)).await,
            Err(RagError::IndexUnavailable(_))
        ));
        assert_eq!(index.index_dims("nope").await.unwrap(), None);
    }
}
