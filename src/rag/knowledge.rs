//! Knowledge base: ingestion into and retrieval from one vector collection.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::loader::{collect_files, read_document, IngestError, IngestReport};
use super::splitter::{TextChunk, TextSplitter};
use super::store::{ChunkSearchResult, StoredChunk, VectorStore};
use crate::core::config::KnowledgeConfig;
use crate::core::errors::ApiError;
use crate::llm::LlmService;

/// Read side used by the prompt graph.
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    async fn query(&self, query: &str, use_retriever: bool) -> Result<Vec<String>, ApiError>;
}

#[derive(Clone)]
pub struct KnowledgeBase {
    store: Arc<dyn VectorStore>,
    llm: LlmService,
    splitter: TextSplitter,
    collection: String,
    extensions: Vec<String>,
    top_k: usize,
    score_threshold: Option<f32>,
    embed_batch_size: usize,
}

impl KnowledgeBase {
    pub fn new(store: Arc<dyn VectorStore>, llm: LlmService, config: &KnowledgeConfig) -> Self {
        Self {
            store,
            llm,
            splitter: TextSplitter::new(config.chunk_size, config.chunk_overlap),
            collection: config.collection.clone(),
            extensions: config.extensions.clone(),
            top_k: config.top_k.max(1),
            score_threshold: config.score_threshold,
            embed_batch_size: config.embed_batch_size.max(1),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    /// Ingests every allowed file below `dir`. Per-file failures are logged
    /// and reported; only an unreadable root directory fails the whole run.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport, ApiError> {
        let root = dir.to_path_buf();
        let extensions = self.extensions.clone();
        let files: Vec<PathBuf> =
            tokio::task::spawn_blocking(move || collect_files(&root, &extensions))
                .await
                .map_err(ApiError::internal)?
                .map_err(|e| {
                    ApiError::BadRequest(format!("Cannot read {}: {}", dir.display(), e))
                })?;

        tracing::info!(
            "Ingesting {} file(s) from {} into '{}'",
            files.len(),
            dir.display(),
            self.collection
        );

        let mut report = IngestReport::default();
        for path in files {
            let outcome = self.ingest_file(&path).await;
            report.record(&path, outcome);
        }

        tracing::info!(
            "Ingestion finished: {} succeeded ({} chunks), {} failed",
            report.succeeded.len(),
            report.total_chunks(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Splits, embeds and stores one file. Returns the number of chunks.
    pub async fn ingest_file(&self, path: &Path) -> Result<usize, IngestError> {
        let text = read_document(path)?;
        let source = path.to_string_lossy().to_string();
        let chunks = self.splitter.split(&text, &source);
        if chunks.is_empty() {
            return Err(IngestError::Empty);
        }
        tracing::debug!("{} split into {} chunk(s)", source, chunks.len());

        let mut items = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self
                .llm
                .embed(&texts)
                .await
                .map_err(|e| IngestError::Embedding(e.to_string()))?;
            if embeddings.len() != batch.len() {
                return Err(IngestError::Embedding(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            for (chunk, embedding) in batch.iter().zip(embeddings) {
                items.push((self.to_stored(chunk), embedding));
            }
        }

        self.store
            .replace_source(&self.collection, &source, items)
            .await
            .map_err(|e| IngestError::Store(e.to_string()))
    }

    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let embedding = self.llm.embed_one(query).await?;
        self.store.search(&self.collection, &embedding, limit).await
    }

    pub async fn count(&self) -> Result<usize, ApiError> {
        self.store.count(&self.collection).await
    }

    pub async fn reset(&self) -> Result<usize, ApiError> {
        let removed = self.store.delete_collection(&self.collection).await?;
        tracing::info!("Cleared {} chunk(s) from '{}'", removed, self.collection);
        Ok(removed)
    }

    fn to_stored(&self, chunk: &TextChunk) -> StoredChunk {
        StoredChunk {
            chunk_id: chunk_id(&self.collection, chunk),
            collection: self.collection.clone(),
            source: chunk.source.clone(),
            chunk_index: chunk.chunk_index,
            start_offset: chunk.start_offset,
            content: chunk.text.clone(),
        }
    }
}

#[async_trait]
impl DocumentRetriever for KnowledgeBase {
    /// Raw text of the nearest chunks. The retriever variant also applies the
    /// configured score threshold and drops repeated contents.
    async fn query(&self, query: &str, use_retriever: bool) -> Result<Vec<String>, ApiError> {
        let results = self.search(query, self.top_k).await?;

        if !use_retriever {
            return Ok(results.into_iter().map(|r| r.chunk.content).collect());
        }

        let mut seen = HashSet::new();
        Ok(results
            .into_iter()
            .filter(|r| self.score_threshold.map_or(true, |min| r.score >= min))
            .filter(|r| seen.insert(r.chunk.content.clone()))
            .map(|r| r.chunk.content)
            .collect())
    }
}

fn chunk_id(collection: &str, chunk: &TextChunk) -> String {
    let mut hasher = Sha256::new();
    hasher.update(collection.as_bytes());
    hasher.update([0u8]);
    hasher.update(chunk.source.as_bytes());
    hasher.update([0u8]);
    hasher.update(chunk.chunk_index.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(chunk.text.as_bytes());
    hex::encode(hasher.finalize())
}
