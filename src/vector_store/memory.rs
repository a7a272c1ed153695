//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets. Chunks are held in a Vec so that
//! insertion order is preserved for tie-breaking equal scores.

use super::{cosine_similarity, Chunk, DocumentSummary, SearchResult, VectorStore};
use crate::error::{LeseError, Result};
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    dimensions: usize,
    chunks: RwLock<Vec<Chunk>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store for the given embedding dimension.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            chunks: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
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

        let mut store = self.chunks.write().unwrap();
        store.extend(chunks.iter().cloned());
        Ok(chunks.len())
    }

    async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(query_embedding, k, f32::MIN).await
    }

    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let chunks = self.chunks.read().unwrap();

        if chunks.is_empty() {
            return Err(LeseError::EmptyIndex);
        }

        let mut results: Vec<SearchResult> = chunks
            .iter()
            .map(|chunk| {
                let score = cosine_similarity(query_embedding, &chunk.embedding);
                SearchResult {
                    chunk: chunk.clone(),
                    score,
                }
            })
            .filter(|r| r.score >= min_score)
            .collect();

        // Stable sort keeps insertion order for equal scores.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);

        Ok(results)
    }

    async fn delete_by_source(&self, source_document: &str) -> Result<usize> {
        let mut chunks = self.chunks.write().unwrap();
        let initial_len = chunks.len();
        chunks.retain(|c| c.source_document != source_document);
        Ok(initial_len - chunks.len())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let chunks = self.chunks.read().unwrap();

        let mut summaries: Vec<DocumentSummary> = Vec::new();
        for chunk in chunks.iter() {
            match summaries
                .iter_mut()
                .find(|s| s.source_document == chunk.source_document)
            {
                Some(summary) => {
                    summary.chunk_count += 1;
                    if chunk.indexed_at > summary.indexed_at {
                        summary.indexed_at = chunk.indexed_at;
                    }
                }
                None => summaries.push(DocumentSummary {
                    source_document: chunk.source_document.clone(),
                    chunk_count: 1,
                    indexed_at: chunk.indexed_at,
                }),
            }
        }

        summaries.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));
        Ok(summaries)
    }

    async fn get_by_source(&self, source_document: &str) -> Result<Vec<Chunk>> {
        let chunks = self.chunks.read().unwrap();
        let mut result: Vec<Chunk> = chunks
            .iter()
            .filter(|c| c.source_document == source_document)
            .cloned()
            .collect();
        result.sort_by_key(|c| c.chunk_index);
        Ok(result)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let chunks = self.chunks.read().unwrap();
        Ok(chunks.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut chunks = self.chunks.write().unwrap();
        chunks.clear();
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
    async fn test_add_and_search() {
        let store = MemoryVectorStore::new(3);

        store
            .add_batch(&[
                chunk("a.txt", 0, vec![1.0, 0.0, 0.0]),
                chunk("a.txt", 1, vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.chunk_count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].chunk.chunk_index, 0);
    }

    #[tokio::test]
    async fn test_search_empty_index_fails() {
        let store = MemoryVectorStore::new(3);
        let err = store.search(&[1.0, 0.0, 0.0], 5).await.unwrap_err();
        assert!(matches!(err, LeseError::EmptyIndex));
    }

    #[tokio::test]
    async fn test_search_limits_and_orders_results() {
        let store = MemoryVectorStore::new(2);
        store
            .add_batch(&[
                chunk("a.txt", 0, vec![0.1, 1.0]),
                chunk("a.txt", 1, vec![1.0, 0.0]),
                chunk("a.txt", 2, vec![0.7, 0.7]),
                chunk("a.txt", 3, vec![0.9, 0.1]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(results[0].chunk.chunk_index, 1);
    }

    #[tokio::test]
    async fn test_equal_scores_tie_break_on_insertion_order() {
        let store = MemoryVectorStore::new(2);
        // Identical embeddings, identical scores.
        store
            .add_batch(&[
                chunk("a.txt", 0, vec![1.0, 0.0]),
                chunk("b.txt", 0, vec![1.0, 0.0]),
                chunk("c.txt", 0, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 10).await.unwrap();
        let order: Vec<&str> = results
            .iter()
            .map(|r| r.chunk.source_document.as_str())
            .collect();
        assert_eq!(order, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = MemoryVectorStore::new(3);
        let err = store
            .add_batch(&[chunk("a.txt", 0, vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, LeseError::VectorStore(_)));
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_source_and_list() {
        let store = MemoryVectorStore::new(2);
        store
            .add_batch(&[
                chunk("a.txt", 0, vec![1.0, 0.0]),
                chunk("a.txt", 1, vec![0.0, 1.0]),
                chunk("b.txt", 0, vec![0.5, 0.5]),
            ])
            .await
            .unwrap();

        let documents = store.list_documents().await.unwrap();
        assert_eq!(documents.len(), 2);

        let deleted = store.delete_by_source("a.txt").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.chunk_count().await.unwrap(), 1);

        let documents = store.list_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].source_document, "b.txt");
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryVectorStore::new(2);
        store
            .add_batch(&[chunk("a.txt", 0, vec![1.0, 0.0])])
            .await
            .unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }
}
