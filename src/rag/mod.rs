//! Knowledge-base retrieval.
//!
//! This module provides:
//! - `TextSplitter`: fixed-size overlapping character windows
//! - `loader`: directory walking and typed per-file ingestion outcomes
//! - `VectorStore` / `SqliteVectorStore`: persistent chunk collection
//! - `KnowledgeBase`: ingestion and similarity queries over one collection

pub mod knowledge;
pub mod loader;
pub mod splitter;
pub mod sqlite;
pub mod store;

pub use knowledge::{DocumentRetriever, KnowledgeBase};
pub use loader::{IngestError, IngestReport};
pub use splitter::{TextChunk, TextSplitter};
pub use sqlite::SqliteVectorStore;
pub use store::{ChunkSearchResult, StoredChunk, VectorStore};
