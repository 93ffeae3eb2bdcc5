//! PatentWhisperer - semantic patent search with retrieval-augmented answers
//!
//! # Architecture
//!
//! - **Ingestion**: JSON records -> embeddings -> search index
//! - **Query pipeline**: validate -> embed -> k-NN search -> bounded context -> generation
//! - **Service seams**: `Embedder`, `IndexClient` and `Generator` traits, injected as
//!   `Arc<dyn Trait>` handles built once at startup

pub mod errors;
pub mod types;
pub mod config;

// Re-export commonly used types
pub use errors::{RagError, Result};

// Services
pub mod embedding;
pub mod index;
pub mod generation;

// Retrieval-augmented answering
pub mod rag;
pub mod ingest;

// Interface layer
pub mod cli;
pub mod doctor;
pub mod repl;
pub mod telemetry;

pub use rag::{RagAnswer, RagPipeline};
