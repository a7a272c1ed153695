//! Lese - Document Question Answering with RAG
//!
//! A local-first CLI tool for chatting with your documents.
//!
//! The name "Lese" comes from the Norwegian/Scandinavian word for "read."
//!
//! # Overview
//!
//! Lese allows you to:
//! - Ingest PDF, text, and markdown files into a searchable vector index
//! - Ask questions and get AI-powered answers with source citations
//! - Keep a bounded conversation memory across questions
//! - Search through your documents semantically
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `extract` - Document text extraction (PDF, text, markdown)
//! - `chunking` - Overlapping character-window text splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `memory` - Conversation memory
//! - `rag` - Retrieval and answer generation
//! - `pipeline` - Ingestion and query coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use lese::config::Settings;
//! use lese::pipeline::{Pipeline, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(settings)?;
//!
//!     let file = UploadedFile {
//!         name: "notes.txt".to_string(),
//!         bytes: std::fs::read("notes.txt")?,
//!     };
//!     let report = pipeline.ingest_files(&[file]).await?;
//!     println!("Indexed {} chunks", report.chunks_indexed);
//!
//!     let result = pipeline.ask("What are the notes about?").await?;
//!     println!("{}", result.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod memory;
pub mod openai;
pub mod pipeline;
pub mod rag;
pub mod vector_store;

pub use error::{LeseError, Result};
