//! Text chunking for breaking documents into searchable segments.
//!
//! Splits extracted text into fixed-size character windows with a configured
//! overlap between consecutive windows.

use crate::error::{LeseError, Result};
use serde::{Deserialize, Serialize};

/// A chunk of content from a source document, before embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentChunk {
    /// File name of the source document.
    pub source_document: String,
    /// Order of this chunk within the document.
    pub chunk_index: i32,
    /// Text content of this chunk.
    pub content: String,
}

impl ContentChunk {
    /// Create a new content chunk.
    pub fn new(source_document: &str, chunk_index: i32, content: String) -> Self {
        Self {
            source_document: source_document.to_string(),
            chunk_index,
            content,
        }
    }
}

/// Character-window text splitter with overlap.
///
/// Window starts advance by `chunk_size - overlap`, so consecutive chunks
/// share exactly `overlap` characters. A trailing remnant of at most
/// `overlap` new characters is absorbed into the final window instead of
/// being emitted as a runt chunk, so the last chunk may be up to
/// `chunk_size + overlap` characters long.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl TextSplitter {
    /// Create a new splitter. The overlap must be smaller than the chunk size.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(LeseError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(LeseError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Split text into overlapping chunks.
    ///
    /// Whitespace-only text yields zero chunks; no emitted chunk is empty.
    /// Window boundaries are measured in characters and never split a UTF-8
    /// scalar value.
    pub fn split(&self, text: &str, source_document: &str) -> Vec<ContentChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        // Byte offset of each char boundary, so char-based windows map to
        // valid string slices.
        let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let char_count = offsets.len();
        let byte_at = |pos: usize| {
            if pos >= char_count {
                text.len()
            } else {
                offsets[pos]
            }
        };

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut chunk_index = 0i32;

        loop {
            let mut end = (start + self.chunk_size).min(char_count);
            if char_count - end <= self.overlap {
                // Remaining tail would be mostly overlap duplication.
                end = char_count;
            }

            let content = text[byte_at(start)..byte_at(end)].to_string();
            chunks.push(ContentChunk::new(source_document, chunk_index, content));
            chunk_index += 1;

            if end == char_count {
                break;
            }
            start = end - self.overlap;
        }

        chunks
    }
}
