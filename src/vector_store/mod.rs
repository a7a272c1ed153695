//! Vector store abstraction for Lese.
//!
//! Provides a trait-based interface for different vector database backends.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An embedded chunk stored in the vector database.
///
/// Immutable once created; the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID.
    pub id: Uuid,
    /// File name of the source document.
    pub source_document: String,
    /// Order of this chunk within the document.
    pub chunk_index: i32,
    /// Text content of this chunk.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this chunk was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(
        source_document: String,
        chunk_index: i32,
        content: String,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_document,
            chunk_index,
            content,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Summary information about an indexed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// File name of the source document.
    pub source_document: String,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// When the document was indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
///
/// Implementations must preserve insertion order when iterating chunks so
/// that equal-score search results tie-break on insertion order.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append a batch of chunks to the index.
    ///
    /// Fails if any embedding does not match the store's configured dimension.
    async fn add_batch(&self, chunks: &[Chunk]) -> Result<usize>;

    /// Search for the chunks most similar to the query embedding.
    ///
    /// Returns up to `k` results in descending score order, ties broken by
    /// insertion order. Fails with `EmptyIndex` when no chunks are stored.
    async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Search with a minimum similarity threshold.
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Delete all chunks belonging to a source document.
    async fn delete_by_source(&self, source_document: &str) -> Result<usize>;

    /// List all indexed documents.
    async fn list_documents(&self) -> Result<Vec<DocumentSummary>>;

    /// Get all chunks for a source document, in chunk order.
    async fn get_by_source(&self, source_document: &str) -> Result<Vec<Chunk>>;

    /// Get total chunk count.
    async fn chunk_count(&self) -> Result<usize>;

    /// Remove every chunk from the index.
    async fn clear(&self) -> Result<()>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
