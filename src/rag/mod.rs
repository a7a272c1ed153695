//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! Provides the ability to ask questions and get answers from the document
//! knowledge base.

pub mod context;
mod engine;
pub mod prompt;

pub use context::ContextBuilder;
pub use engine::{RagEngine, RagResponse};

use crate::vector_store::SearchResult;

/// A retrieved chunk ready to be used as prompt context.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    /// File name of the source document.
    pub source_document: String,
    /// Order of this chunk within the document.
    pub chunk_index: i32,
    /// Text content.
    pub content: String,
    /// Similarity score.
    pub score: f32,
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            source_document: result.chunk.source_document,
            chunk_index: result.chunk.chunk_index,
            content: result.chunk.content,
            score: result.score,
        }
    }
}
