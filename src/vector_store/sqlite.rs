//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For large datasets consider the sqlite-vec extension or a dedicated
//! vector database.

use super::{cosine_similarity, Chunk, DocumentSummary, SearchResult, VectorStore};
use crate::error::{LeseError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    source_document TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_document);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    dimensions: usize,
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path, dimensions: usize) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            dimensions,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory(dimensions: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            dimensions,
            conn: Mutex::new(conn),
        })
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LeseError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chunk> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(4)?;
        let indexed_at_str: String = row.get(5)?;

        Ok(Chunk {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            source_document: row.get(1)?,
            chunk_index: row.get(2)?,
            content: row.get(3)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, chunks))]
    async fn add_batch(&self, chunks: &[Chunk]) -> Result<usize> {
        for chunk in chunks {
            if chunk.embedding.len() != self.dimensions {
                return Err(LeseError::VectorStore(format!(
                    "embedding dimension mismatch for '{}' chunk {}: expected {}, got {}",
                    chunk.source_document,
                    chunk.chunk_index,
                    self.dimensions,
                    chunk.embedding.len()
                )));
            }
        }

        let conn = self.lock_conn()?;
        let tx = conn.unchecked_transaction()?;

        for chunk in chunks {
            let embedding_bytes = Self::embedding_to_bytes(&chunk.embedding);

            tx.execute(
                r#"
                INSERT INTO chunks (id, source_document, chunk_index, content, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    chunk.id.to_string(),
                    chunk.source_document,
                    chunk.chunk_index,
                    chunk.content,
                    embedding_bytes,
                    chunk.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Indexed {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(query_embedding, k, f32::MIN).await
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock_conn()?;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        if total == 0 {
            return Err(LeseError::EmptyIndex);
        }

        // rowid order = insertion order, which is the tie-break for equal scores.
        let mut stmt = conn.prepare(
            r#"
            SELECT id, source_document, chunk_index, content, embedding, indexed_at
            FROM chunks
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([], Self::row_to_chunk)?;

        let mut results: Vec<SearchResult> = rows
            .filter_map(|chunk_result| chunk_result.ok())
            .map(|chunk| {
                let score = cosine_similarity(query_embedding, &chunk.embedding);
                SearchResult { chunk, score }
            })
            .filter(|r| r.score >= min_score)
            .collect();

        // Stable sort keeps insertion order for equal scores.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn delete_by_source(&self, source_document: &str) -> Result<usize> {
        let conn = self.lock_conn()?;

        let deleted = conn.execute(
            "DELETE FROM chunks WHERE source_document = ?1",
            params![source_document],
        )?;

        debug!("Deleted {} chunks for '{}'", deleted, source_document);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT source_document, COUNT(*) as chunk_count, MAX(indexed_at) as indexed_at
            FROM chunks
            GROUP BY source_document
            ORDER BY indexed_at DESC
            "#,
        )?;

        let documents = stmt.query_map([], |row| {
            let indexed_at_str: String = row.get(2)?;
            Ok(DocumentSummary {
                source_document: row.get(0)?,
                chunk_count: row.get(1)?,
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let result: Vec<DocumentSummary> = documents.filter_map(|d| d.ok()).collect();
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn get_by_source(&self, source_document: &str) -> Result<Vec<Chunk>> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, source_document, chunk_index, content, embedding, indexed_at
            FROM chunks
            WHERE source_document = ?1
            ORDER BY chunk_index
            "#,
        )?;

        let chunks = stmt.query_map(params![source_document], Self::row_to_chunk)?;

        let result: Vec<Chunk> = chunks.filter_map(|c| c.ok()).collect();
        debug!("Found {} chunks for '{}'", result.len(), source_document);
        Ok(result)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock_conn()?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM chunks", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, index: i32, embedding: Vec<f32>) -> Chunk {
        Chunk::new(
            source.to_string(),
            index,
            format!("content {}", index),
            embedding,
        )
    }

    #[tokio::test]
    async fn test_sqlite_round_trip() {
        let store = SqliteVectorStore::in_memory(3).unwrap();

        store
            .add_batch(&[
                chunk("report.pdf", 0, vec![1.0, 0.0, 0.0]),
                chunk("report.pdf", 1, vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        let documents = store.list_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].source_document, "report.pdf");
        assert_eq!(documents[0].chunk_count, 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].chunk.content, "content 0");

        let by_source = store.get_by_source("report.pdf").await.unwrap();
        assert_eq!(by_source.len(), 2);
        assert_eq!(by_source[0].chunk_index, 0);
        assert_eq!(by_source[0].embedding, vec![1.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_empty_index_search_fails() {
        let store = SqliteVectorStore::in_memory(3).unwrap();
        let err = store.search(&[1.0, 0.0, 0.0], 5).await.unwrap_err();
        assert!(matches!(err, LeseError::EmptyIndex));
    }

    #[tokio::test]
    async fn test_equal_scores_tie_break_on_insertion_order() {
        let store = SqliteVectorStore::in_memory(2).unwrap();
        store
            .add_batch(&[
                chunk("first.txt", 0, vec![1.0, 0.0]),
                chunk("second.txt", 0, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results[0].chunk.source_document, "first.txt");
        assert_eq!(results[1].chunk.source_document, "second.txt");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = SqliteVectorStore::in_memory(3).unwrap();
        let err = store
            .add_batch(&[chunk("a.txt", 0, vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, LeseError::VectorStore(_)));
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = SqliteVectorStore::in_memory(2).unwrap();
        store
            .add_batch(&[
                chunk("a.txt", 0, vec![1.0, 0.0]),
                chunk("b.txt", 0, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let deleted = store.delete_by_source("a.txt").await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.chunk_count().await.unwrap(), 1);

        store.clear().await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }
}
