// Retrieval-augmented answering over the patent index
//
// Components:
// - Context: bounded concatenation of ranked hits
// - Prompt: fixed system/user templates
// - Pipeline: validate, embed, search, assemble, generate

pub mod context;
pub mod pipeline;
pub mod prompt;

// Re-export key types
pub use context::{AssembledContext, ContextBuilder, ContextConfig, TruncationStrategy};
pub use pipeline::{PipelineConfig, RagAnswer, RagPipeline, StageTimings};
