//! Type definitions module
//!
//! Domain records shared by ingestion, search and generation.

pub mod messages;
pub mod patent;

// Re-export commonly used types
pub use messages::{ChatMessage, Role};
pub use patent::{PatentRecord, PatentSource, Query, SearchHit};
