// End-to-end query pipeline: validate -> embed -> retrieve -> context -> generate
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::Config;
use crate::embedding::Embedder;
use crate::errors::{RagError, Result};
use crate::generation::Generator;
use crate::index::{IndexClient, KnnQuery};
use crate::rag::context::{ContextBuilder, ContextConfig};
use crate::rag::prompt::build_messages;
use crate::types::{Query, SearchHit};

/// Pipeline parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub index_name: String,
    /// Candidate pool floor; raised to `top_k` when smaller
    pub num_candidates: usize,
    pub max_top_k: usize,
    pub context: ContextConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            index_name: config.index.name.clone(),
            num_candidates: config.index.num_candidates,
            max_top_k: config.query.max_top_k,
            context: ContextConfig {
                max_context_chars: config.query.max_context_chars,
                strategy: config.query.truncation,
            },
        }
    }
}

/// Wall-clock milliseconds per stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub embed_ms: u64,
    pub search_ms: u64,
    pub generate_ms: u64,
}

/// Result of one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub query: String,
    pub top_k: usize,
    /// `None` when generation failed
    pub answer: Option<String>,
    pub generation_error: Option<String>,
    pub hits: Vec<SearchHit>,
    pub context_truncated: bool,
    pub timings: StageTimings,
}

impl RagAnswer {
    /// Hits are present but the answer is not
    pub fn is_degraded(&self) -> bool {
        self.answer.is_none()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Retrieval-augmented answering over a patent index
pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn IndexClient>,
    generator: Arc<dyn Generator>,
    context_builder: ContextBuilder,
    config: PipelineConfig,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn IndexClient>,
        generator: Arc<dyn Generator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            generator,
            context_builder: ContextBuilder::with_config(config.context),
            config,
        }
    }

    /// Get current configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer one query.
    ///
    /// Validation, embedding and search failures are errors. A generation
    /// failure is not: the hits come back with `answer = None`.
    pub async fn run(&self, query: &Query) -> Result<RagAnswer> {
        query.validate(self.config.max_top_k)?;
        let mut timings = StageTimings::default();

        // Step 1: Embed
        let started = Instant::now();
        let vector = self.embedder.embed(&query.text).await?;
        timings.embed_ms = elapsed_ms(started);
        debug!(
            model = self.embedder.model_name(),
            dims = vector.len(),
            elapsed_ms = timings.embed_ms,
            "Embedded query"
        );

        // Step 2: Retrieve
        let started = Instant::now();
        let knn = KnnQuery::new(vector, query.top_k, self.config.num_candidates);
        let mut hits = self.index.knn_search(&self.config.index_name, &knn).await?;
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(query.top_k);
        timings.search_ms = elapsed_ms(started);
        debug!(
            index = %self.config.index_name,
            hits = hits.len(),
            num_candidates = knn.num_candidates,
            elapsed_ms = timings.search_ms,
            "Retrieved hits"
        );

        // Step 3: Build context
        let context = self.context_builder.build(&hits);
        debug!(
            chars = context.text.chars().count(),
            hits_included = context.hits_included,
            truncated = context.truncated,
            "Assembled context"
        );

        // Step 4: Generate
        let messages = build_messages(&query.text, &context.text);
        let started = Instant::now();
        let outcome = self.generator.generate(&messages).await;
        timings.generate_ms = elapsed_ms(started);

        let (answer, generation_error) = match outcome {
            Ok(text) => {
                debug!(
                    model = self.generator.model(),
                    elapsed_ms = timings.generate_ms,
                    "Generated answer"
                );
                (Some(text), None)
            }
            Err(e) => {
                warn!(error = %e, hits = hits.len(), "Generation failed, returning hits only");
                (None, Some(e.to_string()))
            }
        };

        Ok(RagAnswer {
            query: query.text.clone(),
            top_k: query.top_k,
            answer,
            generation_error,
            hits,
            context_truncated: context.truncated,
            timings,
        })
    }

    /// `run` bounded by a caller-side deadline; the in-flight future is dropped on expiry
    pub async fn run_with_timeout(&self, query: &Query, limit: Duration) -> Result<RagAnswer> {
        match tokio::time::timeout(limit, self.run(query)).await {
            Ok(result) => result,
            Err(_) => Err(RagError::Timeout {
                duration_ms: limit.as_millis() as u64,
            }),
        }
    }
}
