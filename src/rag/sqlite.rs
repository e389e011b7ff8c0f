//! SQLite-backed vector store.
//!
//! Chunks and their embeddings live in a single `vectors.db` under the
//! persist directory; search is a brute-force cosine scan over one collection.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkSearchResult, StoredChunk, VectorStore};
use crate::core::errors::ApiError;
use crate::vector_math::{cosine_similarity, deserialize_embedding, serialize_embedding};

pub const DB_FILE_NAME: &str = "vectors.db";

pub struct SqliteVectorStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteVectorStore {
    pub async fn open(persist_dir: &Path) -> Result<Self, ApiError> {
        std::fs::create_dir_all(persist_dir).map_err(ApiError::internal)?;
        Self::with_path(persist_dir.join(DB_FILE_NAME)).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT NOT NULL,
                collection TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                chunk_index INTEGER NOT NULL DEFAULT 0,
                start_offset INTEGER NOT NULL DEFAULT 0,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (collection, chunk_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(collection, source)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        StoredChunk {
            chunk_id: row.get("chunk_id"),
            collection: row.get("collection"),
            source: row.get("source"),
            chunk_index: row.get::<i64, _>("chunk_index").max(0) as usize,
            start_offset: row.get::<i64, _>("start_offset").max(0) as usize,
            content: row.get("content"),
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        for (chunk, embedding) in &items {
            insert_chunk(&mut tx, chunk, embedding).await?;
        }
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        if limit == 0 || query_embedding.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT chunk_id, collection, source, chunk_index, start_offset, content, embedding
             FROM chunks WHERE collection = ?1",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let embedding = deserialize_embedding(&blob);
            match cosine_similarity(query_embedding, &embedding) {
                Ok(score) => scored.push(ChunkSearchResult {
                    chunk: Self::row_to_chunk(row),
                    score,
                }),
                Err(err) => {
                    let chunk_id: String = row.get("chunk_id");
                    tracing::warn!("Skipping chunk {} during search: {}", chunk_id, err);
                }
            }
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn replace_source(
        &self,
        collection: &str,
        source: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<usize, ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("DELETE FROM chunks WHERE collection = ?1 AND source = ?2")
            .bind(collection)
            .bind(source)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        // Dropping `tx` on any error below rolls the delete back.
        for (chunk, embedding) in &items {
            if chunk.collection != collection || chunk.source != source {
                return Err(ApiError::Internal(format!(
                    "chunk {} does not belong to {}:{}",
                    chunk.chunk_id, collection, source
                )));
            }
            insert_chunk(&mut tx, chunk, embedding).await?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(items.len())
    }

    async fn delete_source(&self, collection: &str, source: &str) -> Result<usize, ApiError> {
        let result = sqlx::query("DELETE FROM chunks WHERE collection = ?1 AND source = ?2")
            .bind(collection)
            .bind(source)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(result.rows_affected() as usize)
    }

    async fn delete_collection(&self, collection: &str) -> Result<usize, ApiError> {
        let result = sqlx::query("DELETE FROM chunks WHERE collection = ?1")
            .bind(collection)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(result.rows_affected() as usize)
    }

    async fn count(&self, collection: &str) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count.max(0) as usize)
    }
}

async fn insert_chunk(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    chunk: &StoredChunk,
    embedding: &[f32],
) -> Result<(), ApiError> {
    sqlx::query(
        "INSERT OR REPLACE INTO chunks
            (chunk_id, collection, source, chunk_index, start_offset, content, embedding)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(&chunk.chunk_id)
    .bind(&chunk.collection)
    .bind(&chunk.source)
    .bind(chunk.chunk_index as i64)
    .bind(chunk.start_offset as i64)
    .bind(&chunk.content)
    .bind(serialize_embedding(embedding))
    .execute(&mut **tx)
    .await
    .map_err(ApiError::internal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store(dir: &tempfile::TempDir) -> SqliteVectorStore {
        SqliteVectorStore::open(dir.path()).await.unwrap()
    }

    fn make_chunk(id: &str, content: &str, source: &str, collection: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            collection: collection.to_string(),
            source: source.to_string(),
            chunk_index: 0,
            start_offset: 0,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_and_search_orders_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;

        store
            .insert_batch(vec![
                (make_chunk("c1", "east", "a.md", "bot"), vec![1.0, 0.0, 0.0]),
                (make_chunk("c2", "north", "a.md", "bot"), vec![0.0, 1.0, 0.0]),
                (make_chunk("c3", "north-east", "b.md", "bot"), vec![0.7, 0.7, 0.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.count("bot").await.unwrap(), 3);

        let results = store.search("bot", &[1.0, 0.1, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_id, "c1");
        assert_eq!(results[1].chunk.chunk_id, "c3");
        assert!(results[0].score > 0.99);
        assert!(dir.path().join(DB_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;

        store
            .insert_batch(vec![
                (make_chunk("c1", "one", "a.md", "bot"), vec![1.0]),
                (make_chunk("c1", "one", "a.md", "other"), vec![1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.count("bot").await.unwrap(), 1);
        assert_eq!(store.delete_collection("other").await.unwrap(), 1);
        assert_eq!(store.count("other").await.unwrap(), 0);
        assert_eq!(store.search("bot", &[1.0], 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reinsert_replaces_and_delete_source_removes() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;

        store
            .insert_batch(vec![(make_chunk("c1", "old", "a.md", "bot"), vec![1.0])])
            .await
            .unwrap();
        store
            .insert_batch(vec![
                (make_chunk("c1", "new", "a.md", "bot"), vec![1.0]),
                (make_chunk("c2", "other", "b.md", "bot"), vec![1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.count("bot").await.unwrap(), 2);
        let results = store.search("bot", &[1.0], 10).await.unwrap();
        assert!(results.iter().any(|r| r.chunk.content == "new"));
        assert!(!results.iter().any(|r| r.chunk.content == "old"));

        assert_eq!(store.delete_source("bot", "a.md").await.unwrap(), 1);
        assert_eq!(store.count("bot").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;

        store
            .insert_batch(vec![
                (make_chunk("c1", "two dims", "a.md", "bot"), vec![1.0, 0.0]),
                (make_chunk("c2", "three dims", "a.md", "bot"), vec![1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search("bot", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk_id, "c1");
    }

    #[tokio::test]
    async fn replace_source_swaps_chunks_or_leaves_them_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;

        store
            .insert_batch(vec![
                (make_chunk("c1", "old one", "a.md", "bot"), vec![1.0]),
                (make_chunk("c2", "old two", "a.md", "bot"), vec![1.0]),
                (make_chunk("c3", "kept", "b.md", "bot"), vec![1.0]),
            ])
            .await
            .unwrap();

        let bad = vec![
            (make_chunk("n1", "new", "a.md", "bot"), vec![1.0]),
            (make_chunk("n2", "stray", "b.md", "bot"), vec![1.0]),
        ];
        assert!(store.replace_source("bot", "a.md", bad).await.is_err());
        assert_eq!(store.count("bot").await.unwrap(), 3);

        let good = vec![(make_chunk("n1", "new", "a.md", "bot"), vec![1.0])];
        assert_eq!(store.replace_source("bot", "a.md", good).await.unwrap(), 1);
        assert_eq!(store.count("bot").await.unwrap(), 2);
        let contents: Vec<String> = store
            .search("bot", &[1.0], 10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.chunk.content)
            .collect();
        assert!(contents.contains(&"new".to_string()));
        assert!(!contents.iter().any(|c| c.starts_with("old")));
    }
}
