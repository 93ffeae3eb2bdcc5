//! Elasticsearch index client (REST over reqwest)
//!
//! Endpoints used:
//! - HEAD /{index}, GET /{index}/_mapping, PUT /{index}
//! - POST /{index}/_doc, POST /{index}/_search, POST /{index}/_refresh

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::IndexConfig;
use crate::errors::{RagError, Result};
use crate::index::{check_existing_dims, IndexClient, KnnQuery, SchemaStatus, VECTOR_FIELD};
use crate::types::patent::check_vector_dims;
use crate::types::{PatentRecord, SearchHit};

/// Elasticsearch client bound to one cluster
#[derive(Debug, Clone)]
pub struct ElasticIndex {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    dims: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_score")]
    score: Option<f32>,
    #[serde(rename = "_source", default)]
    source: Value,
}

impl ElasticIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::IndexUnavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            dims: config.dims,
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let request = self.client.request(method, url);
        match &self.api_key {
            Some(key) => request.header(AUTHORIZATION, format!("ApiKey {}", key)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("Failed to reach search backend: {}", e)))
    }

    async fn expect_success(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(RagError::IndexUnavailable(format!(
            "{} failed: HTTP {}: {}",
            action, status, body
        )))
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self.send(self.request(Method::HEAD, index)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(RagError::IndexUnavailable(format!(
                "Index lookup failed: HTTP {}",
                status
            ))),
        }
    }
}

/// Mapping for `PUT /{index}`
pub fn schema_body(dims: usize) -> Value {
    json!({
        "mappings": {
            "properties": {
                "title": { "type": "text" },
                "abstract": { "type": "text" },
                "url": { "type": "keyword" },
                VECTOR_FIELD: { "type": "dense_vector", "dims": dims }
            }
        }
    })
}

/// Body for `POST /{index}/_search`
pub fn knn_body(query: &KnnQuery) -> Value {
    json!({
        "knn": {
            "field": VECTOR_FIELD,
            "k": query.k,
            "num_candidates": query.num_candidates,
            "query_vector": query.vector,
        },
        "_source": query.fields,
        "size": query.k,
    })
}

/// Body for `POST /{index}/_doc`
pub fn document_body(record: &PatentRecord) -> Value {
    json!({
        "title": record.title,
        "abstract": record.abstract_text,
        "url": record.url_or_empty(),
        VECTOR_FIELD: record.embedding,
    })
}

/// Read `embedding.dims` from a `GET /{index}/_mapping` response
fn dims_from_mapping(mapping: &Value) -> Option<usize> {
    mapping
        .as_object()?
        .values()
        .next()?
        .pointer(&format!("/mappings/properties/{}/dims", VECTOR_FIELD))?
        .as_u64()
        .map(|d| d as usize)
}

#[async_trait]
impl IndexClient for ElasticIndex {
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

        if self.index_exists(index).await? {
            check_existing_dims(self.index_dims(index).await?, dims)?;
            debug!(index, "Index already exists");
            return Ok(SchemaStatus::AlreadyExists);
        }

        let response = self
            .send(self.request(Method::PUT, index).json(&schema_body(dims)))
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            if body.contains("resource_already_exists_exception") {
                return Ok(SchemaStatus::AlreadyExists);
            }
            return Err(RagError::IndexUnavailable(format!(
                "Index creation failed: HTTP 400: {}",
                body
            )));
        }

        Self::expect_success(response, "Index creation").await?;
        debug!(index, dims, "Created index");
        Ok(SchemaStatus::Created)
    }

    async fn upsert(&self, index: &str, record: &PatentRecord) -> Result<()> {
        record.check_dims(self.dims)?;

        let path = format!("{}/_doc", index);
        let response = self
            .send(self.request(Method::POST, &path).json(&document_body(record)))
            .await?;
        Self::expect_success(response, "Document write").await?;
        Ok(())
    }

    async fn knn_search(&self, index: &str, query: &KnnQuery) -> Result<Vec<SearchHit>> {
        check_vector_dims(&query.vector, self.dims)?;

        let path = format!("{}/_search", index);
        let response = self
            .send(self.request(Method::POST, &path).json(&knn_body(query)))
            .await?;
        let response = Self::expect_success(response, "Search").await?;

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            RagError::IndexUnavailable(format!("Malformed search response: {}", e))
        })?;

        let mut hits = parsed
            .hits
            .hits
            .iter()
            .map(|raw| SearchHit::from_source(raw.score.unwrap_or(0.0), &raw.source))
            .collect::<Result<Vec<_>>>()?;
        hits.truncate(query.k);

        debug!(index, hits = hits.len(), "Search complete");
        Ok(hits)
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        let path = format!("{}/_refresh", index);
        let response = self.send(self.request(Method::POST, &path)).await?;
        Self::expect_success(response, "Refresh").await?;
        Ok(())
    }

    async fn index_dims(&self, index: &str) -> Result<Option<usize>> {
        let path = format!("{}/_mapping", index);
        let response = self.send(self.request(Method::GET, &path)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::expect_success(response, "Mapping lookup").await?;
        let mapping: Value = response.json().await.map_err(|e| {
            RagError::IndexUnavailable(format!("Malformed mapping response: {}", e))
        })?;
        Ok(dims_from_mapping(&mapping))
    }

    async fn health_check(&self) -> Result<()> {
        let response = self.send(self.request(Method::GET, "/")).await?;
        Self::expect_success(response, "Health check").await?;
        Ok(())
    }
}
