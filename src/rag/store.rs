//! VectorStore trait: abstract interface over the persistent chunk collection.
//!
//! The primary implementation is `SqliteVectorStore` in the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A stored document chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Content hash identifying the chunk within its collection.
    pub chunk_id: String,
    pub collection: String,
    /// Path of the file the chunk was cut from.
    pub source: String,
    pub chunk_index: usize,
    /// Character offset of the chunk in the source text.
    pub start_offset: usize,
    pub content: String,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace chunks together with their embeddings.
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError>;

    /// Nearest neighbours of `query_embedding` inside `collection`, best first.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    /// Atomically swap every chunk cut from `source` for `items`. On error the
    /// previously stored chunks are left untouched.
    async fn replace_source(
        &self,
        collection: &str,
        source: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<usize, ApiError>;

    /// Remove every chunk cut from `source`. Returns the number removed.
    async fn delete_source(&self, collection: &str, source: &str) -> Result<usize, ApiError>;

    /// Remove the whole collection. Returns the number of chunks removed.
    async fn delete_collection(&self, collection: &str) -> Result<usize, ApiError>;

    async fn count(&self, collection: &str) -> Result<usize, ApiError>;
}
