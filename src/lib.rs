//! Guild chat RAG memory library
//!
//! This library provides tools to:
//! - Ingest chat messages, URLs, and uploaded documents into a vector store
//! - Deduplicate content by fingerprint, merging origin tags in place
//! - Retrieve guild-scoped, score-thresholded context with citations
//! - Delete and export stored records by user/channel/time for privacy
//! - Trigger and list collection snapshots for backup

pub mod config;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod rag;
pub mod text;

// Re-export common types
pub use config::{RagSettings, RetrievalScope};
pub use error::{Error, Result};
pub use rag::{
    ChunkRecord, IngestOrigin, QueryScope, Rag, RecordFilter, RetrievalResult, SourceMessage,
};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
