//! Ingestion and query pipeline for Lese.
//!
//! Coordinates extraction, chunking, embedding, indexing, retrieval, answer
//! generation, and conversation memory.

use crate::chunking::{ContentChunk, TextSplitter};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{LeseError, Result};
use crate::extract::{extract_text, FileFormat};
use crate::memory::{ConversationMemory, Exchange, MemorySummary};
use crate::rag::RagEngine;
use crate::vector_store::{
    Chunk, DocumentSummary, MemoryVectorStore, SqliteVectorStore, VectorStore,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// A file submitted for ingestion.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original file name (used as the source document label).
    pub name: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// Result of ingesting a batch of files.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Files that were successfully chunked and indexed.
    pub processed_files: Vec<String>,
    /// Total chunks indexed across all files.
    pub chunks_indexed: usize,
    /// Per-file failure messages for files that were skipped.
    pub errors: Vec<String>,
}

/// Result of answering a question.
#[derive(Debug, Clone)]
pub struct ChatResult {
    /// The generated answer.
    pub answer: String,
    /// Distinct source documents cited.
    pub sources: Vec<String>,
    /// Number of exchanges currently retained in memory.
    pub memory_length: usize,
}

/// The main pipeline tying ingestion, retrieval, and memory together.
///
/// The conversation memory is owned here behind a mutex and passed into each
/// operation explicitly; the pipeline itself is shared via `Arc` between
/// request handlers.
pub struct Pipeline {
    settings: Settings,
    splitter: TextSplitter,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    engine: RagEngine,
    memory: Mutex<ConversationMemory>,
    memory_path: Option<PathBuf>,
}

impl Pipeline {
    /// Create a new pipeline from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));

        let dimensions = settings.embedding.dimensions as usize;
        let vector_store: Arc<dyn VectorStore> = match settings.vector_store.provider.as_str() {
            "memory" => Arc::new(MemoryVectorStore::new(dimensions)),
            "sqlite" => Arc::new(SqliteVectorStore::new(&settings.sqlite_path(), dimensions)?),
            other => {
                return Err(LeseError::Config(format!(
                    "unknown vector store provider: {}",
                    other
                )))
            }
        };

        let memory_path = settings.data_dir().join("memory.json");
        Self::with_components(settings, prompts, embedder, vector_store)?
            .with_memory_path(memory_path)
    }

    /// Persist the conversation log at `path`, loading any existing log.
    pub fn with_memory_path(mut self, path: PathBuf) -> Result<Self> {
        let memory = ConversationMemory::load(&path, self.settings.memory.max_exchanges)?;
        self.memory = Mutex::new(memory);
        self.memory_path = Some(path);
        Ok(self)
    }

    /// Create a pipeline with custom components (used by tests).
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        let splitter = TextSplitter::new(
            settings.ingestion.chunk_size,
            settings.ingestion.chunk_overlap,
        )?;

        let engine = RagEngine::new(
            vector_store.clone(),
            embedder.clone(),
            &settings.rag.model,
            settings.rag.top_k,
            settings.rag.min_score,
            settings.rag.history_window,
        )
        .with_prompts(prompts);

        let memory = Mutex::new(ConversationMemory::new(settings.memory.max_exchanges));

        Ok(Self {
            settings,
            splitter,
            embedder,
            vector_store,
            engine,
            memory,
            memory_path: None,
        })
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the answer engine.
    pub fn engine(&self) -> &RagEngine {
        &self.engine
    }

    /// Ingest a batch of files: extract, chunk, embed, index.
    ///
    /// A file that fails extraction or embedding is skipped and reported in
    /// the returned errors; the batch continues. Re-uploading a document
    /// replaces its previous chunks. Fails with `Ingestion` only when no
    /// file in the batch produced any chunks.
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn ingest_files(&self, files: &[UploadedFile]) -> Result<IngestReport> {
        if files.is_empty() {
            return Err(LeseError::InvalidInput("no files provided".to_string()));
        }

        let mut processed_files = Vec::new();
        let mut errors = Vec::new();
        let mut chunks_indexed = 0usize;

        for file in files {
            match self.ingest_one(file).await {
                Ok(0) => {
                    warn!("'{}' produced no chunks", file.name);
                    errors.push(format!("{}: document contains no text", file.name));
                }
                Ok(count) => {
                    info!("Indexed {} chunks from '{}'", count, file.name);
                    processed_files.push(file.name.clone());
                    chunks_indexed += count;
                }
                Err(e) => {
                    warn!("Failed to ingest '{}': {}", file.name, e);
                    errors.push(format!("{}: {}", file.name, e));
                }
            }
        }

        if processed_files.is_empty() {
            return Err(LeseError::Ingestion(format!(
                "no documents were processed: {}",
                errors.join("; ")
            )));
        }

        Ok(IngestReport {
            processed_files,
            chunks_indexed,
            errors,
        })
    }

    /// Ingest a single file, returning the number of chunks indexed.
    async fn ingest_one(&self, file: &UploadedFile) -> Result<usize> {
        let format = FileFormat::detect(&file.name)?;
        let text = extract_text(&file.bytes, format)?;

        let content_chunks = self.splitter.split(&text, &file.name);
        if content_chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = content_chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let chunks: Vec<Chunk> = content_chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding): (ContentChunk, Vec<f32>)| {
                Chunk::new(
                    chunk.source_document,
                    chunk.chunk_index,
                    chunk.content,
                    embedding,
                )
            })
            .collect();

        // Re-uploading a document replaces its previous chunks. Snapshot the
        // old chunks first so a failed insert can put them back instead of
        // leaving the document missing from the index.
        let previous = self.vector_store.get_by_source(&file.name).await?;
        self.vector_store.delete_by_source(&file.name).await?;

        match self.vector_store.add_batch(&chunks).await {
            Ok(count) => Ok(count),
            Err(e) => {
                if !previous.is_empty() {
                    if let Err(restore_err) = self.vector_store.add_batch(&previous).await {
                        warn!(
                            "Failed to restore previous chunks for '{}': {}",
                            file.name, restore_err
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Answer a question and record the exchange in memory.
    ///
    /// `EmptyIndex` and `Generation` errors pass through to the caller for
    /// user-facing reporting; nothing is retried.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn ask(&self, question: &str) -> Result<ChatResult> {
        let history = {
            let memory = self.lock_memory()?;
            memory.all()
        };

        let response = self.engine.answer(question, &history).await?;

        let memory_length = self.record_exchange(Exchange::new(
            question.to_string(),
            response.answer.clone(),
            response.sources.clone(),
        ))?;

        Ok(ChatResult {
            answer: response.answer,
            sources: response.sources,
            memory_length,
        })
    }

    /// Append an exchange and persist the log.
    fn record_exchange(&self, exchange: Exchange) -> Result<usize> {
        let mut memory = self.lock_memory()?;
        memory.append(exchange);
        self.persist_memory(&memory)?;
        Ok(memory.len())
    }

    /// Full chronological conversation log.
    pub fn memory_all(&self) -> Result<Vec<Exchange>> {
        Ok(self.lock_memory()?.all())
    }

    /// Last `n` exchanges in chronological order.
    pub fn memory_recent(&self, n: usize) -> Result<Vec<Exchange>> {
        Ok(self.lock_memory()?.recent(n))
    }

    /// Case-insensitive substring search over questions and answers.
    pub fn memory_search(&self, substring: &str) -> Result<Vec<Exchange>> {
        Ok(self.lock_memory()?.search(substring))
    }

    /// Empty the conversation log.
    pub fn memory_clear(&self) -> Result<()> {
        let mut memory = self.lock_memory()?;
        memory.clear();
        self.persist_memory(&memory)
    }

    /// Summarize the memory state.
    pub fn memory_summary(&self) -> Result<MemorySummary> {
        Ok(self.lock_memory()?.summary())
    }

    /// List all indexed documents.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        self.vector_store.list_documents().await
    }

    /// Clear the index and the conversation memory.
    pub async fn reset(&self) -> Result<()> {
        self.vector_store.clear().await?;
        self.memory_clear()?;
        info!("Pipeline reset: index and memory cleared");
        Ok(())
    }

    fn persist_memory(&self, memory: &ConversationMemory) -> Result<()> {
        match &self.memory_path {
            Some(path) => memory.save(path),
            None => Ok(()),
        }
    }

    fn lock_memory(&self) -> Result<std::sync::MutexGuard<'_, ConversationMemory>> {
        self.memory
            .lock()
            .map_err(|e| LeseError::Config(format!("memory lock poisoned: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::SearchResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic embedder for tests: counts letter frequencies.
    struct FakeEmbedder {
        dimensions: usize,
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; self.dimensions];
            for (i, b) in text.bytes().enumerate() {
                v[(b as usize + i) % self.dimensions] += 1.0;
            }
            Ok(v)
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }

    /// Store wrapper that fails the nth `add_batch` call.
    struct FlakyStore {
        inner: MemoryVectorStore,
        fail_on_call: usize,
        calls: AtomicUsize,
    }

    impl FlakyStore {
        fn new(dimensions: usize, fail_on_call: usize) -> Self {
            Self {
                inner: MemoryVectorStore::new(dimensions),
                fail_on_call,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VectorStore for FlakyStore {
        async fn add_batch(&self, chunks: &[Chunk]) -> Result<usize> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on_call {
                return Err(LeseError::VectorStore("write failed".to_string()));
            }
            self.inner.add_batch(chunks).await
        }

        async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
            self.inner.search(query_embedding, k).await
        }

        async fn search_with_threshold(
            &self,
            query_embedding: &[f32],
            k: usize,
            min_score: f32,
        ) -> Result<Vec<SearchResult>> {
            self.inner
                .search_with_threshold(query_embedding, k, min_score)
                .await
        }

        async fn delete_by_source(&self, source_document: &str) -> Result<usize> {
            self.inner.delete_by_source(source_document).await
        }

        async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
            self.inner.list_documents().await
        }

        async fn get_by_source(&self, source_document: &str) -> Result<Vec<Chunk>> {
            self.inner.get_by_source(source_document).await
        }

        async fn chunk_count(&self) -> Result<usize> {
            self.inner.chunk_count().await
        }

        async fn clear(&self) -> Result<()> {
            self.inner.clear().await
        }
    }

    fn test_pipeline() -> Pipeline {
        let mut settings = Settings::default();
        settings.ingestion.chunk_size = 200;
        settings.ingestion.chunk_overlap = 50;
        settings.embedding.dimensions = 8;
        settings.vector_store.provider = "memory".to_string();

        let embedder = Arc::new(FakeEmbedder { dimensions: 8 });
        let vector_store = Arc::new(MemoryVectorStore::new(8));
        Pipeline::with_components(settings, Prompts::default(), embedder, vector_store).unwrap()
    }

    fn text_file(name: &str, content: &str) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            bytes: content.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_ingest_text_file() {
        let pipeline = test_pipeline();
        let content = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let report = pipeline
            .ingest_files(&[text_file("notes.txt", &content)])
            .await
            .unwrap();

        assert_eq!(report.processed_files, vec!["notes.txt"]);
        assert!(report.chunks_indexed > 1);
        assert!(report.errors.is_empty());
        assert_eq!(
            pipeline.vector_store().chunk_count().await.unwrap(),
            report.chunks_indexed
        );
    }

    #[tokio::test]
    async fn test_ingest_skips_failing_files_but_continues() {
        let pipeline = test_pipeline();
        let report = pipeline
            .ingest_files(&[
                text_file("good.txt", "some meaningful content here"),
                text_file("bad.png", "binary"),
                text_file("empty.txt", "   \n  "),
            ])
            .await
            .unwrap();

        assert_eq!(report.processed_files, vec!["good.txt"]);
        assert_eq!(report.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_ingest_all_failures_is_an_error() {
        let pipeline = test_pipeline();
        let err = pipeline
            .ingest_files(&[text_file("bad.png", "binary")])
            .await
            .unwrap_err();
        assert!(matches!(err, LeseError::Ingestion(_)));
    }

    #[tokio::test]
    async fn test_ingest_empty_batch_is_invalid() {
        let pipeline = test_pipeline();
        let err = pipeline.ingest_files(&[]).await.unwrap_err();
        assert!(matches!(err, LeseError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_reingest_replaces_chunks() {
        let pipeline = test_pipeline();
        let long = "alpha beta gamma delta. ".repeat(30);
        pipeline
            .ingest_files(&[text_file("doc.txt", &long)])
            .await
            .unwrap();
        let count_long = pipeline.vector_store().chunk_count().await.unwrap();

        pipeline
            .ingest_files(&[text_file("doc.txt", "short replacement")])
            .await
            .unwrap();
        let count_short = pipeline.vector_store().chunk_count().await.unwrap();

        assert!(count_long > count_short);
        assert_eq!(count_short, 1);
    }

    #[tokio::test]
    async fn test_failed_reingest_keeps_previous_chunks() {
        let mut settings = Settings::default();
        settings.ingestion.chunk_size = 200;
        settings.ingestion.chunk_overlap = 50;
        settings.embedding.dimensions = 8;

        // First add_batch succeeds, the re-ingest's insert fails, the
        // restore insert succeeds again.
        let store = Arc::new(FlakyStore::new(8, 2));
        let embedder = Arc::new(FakeEmbedder { dimensions: 8 });
        let pipeline =
            Pipeline::with_components(settings, Prompts::default(), embedder, store.clone())
                .unwrap();

        pipeline
            .ingest_files(&[text_file("doc.txt", "original content")])
            .await
            .unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 1);

        let err = pipeline
            .ingest_files(&[text_file("doc.txt", "replacement content")])
            .await
            .unwrap_err();
        assert!(matches!(err, LeseError::Ingestion(_)));

        // The previous version survives the failed replacement.
        assert_eq!(store.chunk_count().await.unwrap(), 1);
        let chunks = store.get_by_source("doc.txt").await.unwrap();
        assert_eq!(chunks[0].content, "original content");
    }

    #[tokio::test]
    async fn test_retrieval_on_empty_index_surfaces_empty_index() {
        let pipeline = test_pipeline();
        let err = pipeline.engine().retrieve("anything").await.unwrap_err();
        assert!(matches!(err, LeseError::EmptyIndex));
    }

    #[tokio::test]
    async fn test_memory_accessors() {
        let pipeline = test_pipeline();
        assert!(pipeline.memory_all().unwrap().is_empty());

        pipeline
            .record_exchange(Exchange::new(
                "what is foo?".to_string(),
                "foo is a term".to_string(),
                vec!["doc.txt".to_string()],
            ))
            .unwrap();

        assert_eq!(pipeline.memory_recent(5).unwrap().len(), 1);
        assert_eq!(pipeline.memory_search("FOO").unwrap().len(), 1);
        assert!(pipeline.memory_search("bar").unwrap().is_empty());

        pipeline.memory_clear().unwrap();
        assert!(pipeline.memory_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_persists_across_pipelines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let pipeline = test_pipeline().with_memory_path(path.clone()).unwrap();
        pipeline
            .record_exchange(Exchange::new(
                "what was said?".to_string(),
                "a summary".to_string(),
                vec!["doc.txt".to_string()],
            ))
            .unwrap();

        let reloaded = test_pipeline().with_memory_path(path.clone()).unwrap();
        let all = reloaded.memory_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].question, "what was said?");
        assert_eq!(all[0].sources, vec!["doc.txt"]);

        reloaded.memory_clear().unwrap();
        let after_clear = test_pipeline().with_memory_path(path).unwrap();
        assert!(after_clear.memory_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_index_and_memory() {
        let pipeline = test_pipeline();
        pipeline
            .ingest_files(&[text_file("doc.txt", "content to index")])
            .await
            .unwrap();

        pipeline.reset().await.unwrap();
        assert_eq!(pipeline.vector_store().chunk_count().await.unwrap(), 0);
        assert!(pipeline.memory_all().unwrap().is_empty());
    }
}
