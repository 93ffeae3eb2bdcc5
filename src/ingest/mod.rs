//! Batch ingestion of patent records
//!
//! Reads a JSON array of `{title, abstract, url?}`, embeds each record and
//! writes it to the search index. Sequential; a failure aborts the job and
//! leaves whatever was already written in place.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::embedding::Embedder;
use crate::errors::{RagError, Result};
use crate::index::{IndexClient, SchemaStatus};
use crate::types::PatentSource;

/// Summary of one ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub records_indexed: usize,
    pub schema_created: bool,
    pub duration: Duration,
}

/// Parse the ingestion input file
pub fn load_sources(path: &Path) -> Result<Vec<PatentSource>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| RagError::InvalidInput(format!("{}: {}", path.display(), e)))?;
    parse_sources(&contents)
        .map_err(|e| RagError::InvalidInput(format!("{}: {}", path.display(), e)))
}

fn parse_sources(contents: &str) -> std::result::Result<Vec<PatentSource>, serde_json::Error> {
    serde_json::from_str(contents)
}

/// Embeds and indexes patent records
pub struct IngestJob {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn IndexClient>,
    index_name: String,
    show_progress: bool,
}

impl IngestJob {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn IndexClient>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            index_name: index_name.into(),
            show_progress: false,
        }
    }

    /// Draw a terminal progress bar while indexing
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Load `path` and index every record in it
    pub async fn run(&self, path: &Path) -> Result<IngestReport> {
        let sources = load_sources(path)?;
        info!(file = %path.display(), records = sources.len(), "Loaded patent records");
        self.ingest(sources).await
    }

    /// Index already-parsed records
    pub async fn ingest(&self, sources: Vec<PatentSource>) -> Result<IngestReport> {
        let started = Instant::now();

        let status = self
            .index
            .ensure_schema(&self.index_name, self.embedder.dimension())
            .await?;
        let schema_created = status == SchemaStatus::Created;
        if schema_created {
            info!(index = %self.index_name, dims = self.embedder.dimension(), "Created index");
        }

        let progress = self.progress_bar(sources.len() as u64);
        let mut records_indexed = 0;

        for source in sources {
            progress.set_message(source.title.clone());
            let embedding = self.embedder.embed(&source.embedding_text()).await?;
            let record = source.into_record(embedding);
            self.index.upsert(&self.index_name, &record).await?;
            debug!(title = %record.title, "Indexed record");

            records_indexed += 1;
            progress.inc(1);
        }

        self.index.refresh(&self.index_name).await?;
        progress.finish_and_clear();

        let report = IngestReport {
            records_indexed,
            schema_created,
            duration: started.elapsed(),
        };
        info!(
            index = %self.index_name,
            records = report.records_indexed,
            elapsed_ms = report.duration.as_millis() as u64,
            "Ingestion complete"
        );
        Ok(report)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Indexing [{bar:40.green/blue}] {pos}/{len} | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}
