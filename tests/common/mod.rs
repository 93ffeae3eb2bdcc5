//! Shared test doubles for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use patentwhisperer::embedding::Embedder;
use patentwhisperer::errors::{RagError, Result};
use patentwhisperer::generation::Generator;
use patentwhisperer::index::{IndexClient, KnnQuery, MemoryIndex, SchemaStatus};
use patentwhisperer::types::{ChatMessage, PatentRecord, PatentSource, SearchHit};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const INDEX: &str = "patents";

/// Bag-of-words embedder: each lowercase token is hashed into one bucket
pub struct HashingEmbedder {
    dims: usize,
    pub calls: AtomicUsize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf29ce484222325u64, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a(&token.to_lowercase()) % self.dims as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "hashing-bow"
    }
}

/// Generator with a canned outcome
pub enum ScriptedGenerator {
    Answer(String),
    Fail(String),
    Hang(Duration),
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
        match self {
            ScriptedGenerator::Answer(text) => Ok(text.clone()),
            ScriptedGenerator::Fail(msg) => Err(RagError::Generation(msg.clone())),
            ScriptedGenerator::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                Ok("too late".to_string())
            }
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Records every message list it is asked to complete
#[derive(Default)]
pub struct RecordingGenerator {
    pub seen: Mutex<Vec<Vec<ChatMessage>>>,
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        self.seen
            .lock()
            .map_err(|_| RagError::Generation("poisoned".to_string()))?
            .push(messages.to_vec());
        Ok("recorded".to_string())
    }

    fn model(&self) -> &str {
        "recording"
    }
}

/// MemoryIndex wrapper counting searches
pub struct CountingIndex {
    pub inner: MemoryIndex,
    pub searches: AtomicUsize,
}

impl CountingIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            inner: MemoryIndex::new(dims),
            searches: AtomicUsize::new(0),
        }
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexClient for CountingIndex {
    fn dims(&self) -> usize {
        self.inner.dims()
    }

    async fn ensure_schema(&self, index: &str, dims: usize) -> Result<SchemaStatus> {
        self.inner.ensure_schema(index, dims).await
    }

    async fn upsert(&self, index: &str, record: &PatentRecord) -> Result<()> {
        self.inner.upsert(index, record).await
    }

    async fn knn_search(&self, index: &str, query: &KnnQuery) -> Result<Vec<SearchHit>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.knn_search(index, query).await
    }

    async fn index_dims(&self, index: &str) -> Result<Option<usize>> {
        self.inner.index_dims(index).await
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Index returning a fixed hit list regardless of the query
pub struct CannedIndex {
    pub hits: Vec<SearchHit>,
    pub dims: usize,
}

#[async_trait]
impl IndexClient for CannedIndex {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn ensure_schema(&self, _index: &str, _dims: usize) -> Result<SchemaStatus> {
        Ok(SchemaStatus::AlreadyExists)
    }

    async fn upsert(&self, _index: &str, _record: &PatentRecord) -> Result<()> {
        Ok(())
    }

    async fn knn_search(&self, _index: &str, _query: &KnnQuery) -> Result<Vec<SearchHit>> {
        Ok(self.hits.clone())
    }

    async fn index_dims(&self, _index: &str) -> Result<Option<usize>> {
        Ok(Some(self.dims))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

pub fn hit(title: &str, score: f32) -> SearchHit {
    SearchHit {
        score,
        title: title.to_string(),
        abstract_text: format!("Abstract of {}", title),
        url: String::new(),
    }
}

pub fn glove() -> PatentSource {
    PatentSource {
        title: "Gesture AR Glove".to_string(),
        abstract_text: "A wearable glove for AR gesture control.".to_string(),
        url: Some("http://patents.example/glove".to_string()),
    }
}

pub fn qubits() -> PatentSource {
    PatentSource {
        title: "Quantum Bit Array".to_string(),
        abstract_text: "A quantum computing hardware array.".to_string(),
        url: None,
    }
}

pub const SAMPLE_JSON: &str = r#"[
  {
    "title": "Gesture AR Glove",
    "abstract": "A wearable glove for AR gesture control.",
    "url": "http://patents.example/glove"
  },
  {
    "title": "Quantum Bit Array",
    "abstract": "A quantum computing hardware array."
  }
]"#;
