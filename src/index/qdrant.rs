// Qdrant index client - one collection per patent index
use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        value::Kind, vectors_config::Config as VectorsConfigKind, CreateCollectionBuilder,
        CreateFieldIndexCollectionBuilder, Distance, FieldType, PayloadIncludeSelector,
        PointStruct, SearchParamsBuilder, SearchPoints, SearchPointsBuilder,
        UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
    },
    Payload, Qdrant,
};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::config::IndexConfig;
use crate::errors::{RagError, Result};
use crate::index::{check_existing_dims, IndexClient, KnnQuery, SchemaStatus};
use crate::types::patent::check_vector_dims;
use crate::types::{PatentRecord, SearchHit};

/// Qdrant-backed patent index
pub struct QdrantIndex {
    client: Qdrant,
    dims: usize,
}

fn unavailable(action: &str) -> impl Fn(qdrant_client::QdrantError) -> RagError + '_ {
    move |e| RagError::IndexUnavailable(format!("{} failed: {}", action, e))
}

impl QdrantIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(unavailable("Qdrant client creation"))?;

        Ok(Self {
            client,
            dims: config.dims,
        })
    }

    async fn create_text_indexes(&self, collection: &str) -> Result<()> {
        let fields = [
            ("title", FieldType::Text),
            ("abstract", FieldType::Text),
            ("url", FieldType::Keyword),
        ];
        for (field, field_type) in fields {
            self.client
                .create_field_index(CreateFieldIndexCollectionBuilder::new(
                    collection, field, field_type,
                ))
                .await
                .map_err(unavailable("Payload index creation"))?;
        }
        Ok(())
    }
}

#[async_trait]
impl IndexClient for QdrantIndex {
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

        if self
            .client
            .collection_exists(index)
            .await
            .map_err(unavailable("Collection lookup"))?
        {
            check_existing_dims(self.index_dims(index).await?, dims)?;
            return Ok(SchemaStatus::AlreadyExists);
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(index)
                    .vectors_config(VectorParamsBuilder::new(dims as u64, Distance::Cosine)),
            )
            .await
            .map_err(unavailable("Collection creation"))?;
        self.create_text_indexes(index).await?;

        debug!(collection = index, dims, "Created Qdrant collection");
        Ok(SchemaStatus::Created)
    }

    async fn upsert(&self, index: &str, record: &PatentRecord) -> Result<()> {
        record.check_dims(self.dims)?;

        let payload = Payload::try_from(json!({
            "title": record.title,
            "abstract": record.abstract_text,
            "url": record.url_or_empty(),
        }))
        .map_err(unavailable("Payload conversion"))?;

        let point = PointStruct::new(
            uuid::Uuid::new_v4().to_string(),
            record.embedding.clone(),
            payload,
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(index, vec![point]).wait(true))
            .await
            .map_err(unavailable("Point upsert"))?;

        Ok(())
    }

    async fn knn_search(&self, index: &str, query: &KnnQuery) -> Result<Vec<SearchHit>> {
        check_vector_dims(&query.vector, self.dims)?;

        let response = self
            .client
            .search_points(search_request(index, query))
            .await
            .map_err(unavailable("Search"))?;

        let mut hits = response
            .result
            .into_iter()
            .map(|point| SearchHit::from_source(point.score, &payload_to_json(point.payload)))
            .collect::<Result<Vec<_>>>()?;
        hits.truncate(query.k);

        Ok(hits)
    }

    async fn index_dims(&self, index: &str) -> Result<Option<usize>> {
        if !self
            .client
            .collection_exists(index)
            .await
            .map_err(unavailable("Collection lookup"))?
        {
            return Ok(None);
        }

        let info = self
            .client
            .collection_info(index)
            .await
            .map_err(unavailable("Collection info"))?;

        let size = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|config| match config {
                VectorsConfigKind::Params(params) => Some(params.size as usize),
                VectorsConfigKind::ParamsMap(_) => None,
            });

        Ok(size)
    }

    async fn health_check(&self) -> Result<()> {
        self.client
            .health_check()
            .await
            .map_err(unavailable("Health check"))?;
        Ok(())
    }
}

/// Top-k request returning only the requested payload fields; `ef` is the candidate pool
fn search_request(collection: &str, query: &KnnQuery) -> SearchPoints {
    SearchPointsBuilder::new(collection, query.vector.clone(), query.k as u64)
        .with_payload(PayloadIncludeSelector {
            fields: query.fields.clone(),
        })
        .params(SearchParamsBuilder::default().hnsw_ef(query.num_candidates as u64))
        .build()
}

/// Flatten a Qdrant payload into a JSON object for `SearchHit::from_source`
fn payload_to_json(payload: HashMap<String, QdrantValue>) -> JsonValue {
    let map: Map<String, JsonValue> = payload
        .into_iter()
        .filter_map(|(key, value)| qdrant_to_json_value(&value).map(|v| (key, v)))
        .collect();
    JsonValue::Object(map)
}

fn qdrant_to_json_value(value: &QdrantValue) -> Option<JsonValue> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(JsonValue::String(s.clone())),
        Kind::IntegerValue(i) => Some(JsonValue::Number((*i).into())),
        Kind::DoubleValue(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
        Kind::BoolValue(b) => Some(JsonValue::Bool(*b)),
        _ => None,
    })
}
