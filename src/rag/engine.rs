//! RAG answer generation.

use super::{prompt, ContextBuilder, ContextChunk};
use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::{LeseError, Result};
use crate::memory::Exchange;
use crate::openai::create_client;
use crate::vector_store::VectorStore;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Answer returned when retrieval finds nothing relevant in a non-empty index.
const NO_CONTEXT_ANSWER: &str =
    "I couldn't find any relevant information in your documents for this question.";

/// RAG engine for question answering.
pub struct RagEngine {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    context_builder: ContextBuilder,
    prompts: Prompts,
    history_window: usize,
}

impl RagEngine {
    /// Create a new RAG engine.
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        model: &str,
        top_k: usize,
        min_score: f32,
        history_window: usize,
    ) -> Self {
        let context_builder = ContextBuilder::new(vector_store, embedder)
            .with_top_k(top_k)
            .with_min_score(min_score);

        Self {
            client: create_client(),
            model: model.to_string(),
            context_builder,
            prompts: Prompts::default(),
            history_window,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Answer a question against the knowledge base.
    ///
    /// `history` is the caller-owned conversation log; a bounded window of it
    /// is folded into the prompt. API failure or timeout surfaces as
    /// `Generation` and is never retried here.
    #[instrument(skip(self, history), fields(question = %question))]
    pub async fn answer(&self, question: &str, history: &[Exchange]) -> Result<RagResponse> {
        info!("Processing question: {}", question);

        let context_chunks = self.context_builder.build(question).await?;

        if context_chunks.is_empty() {
            return Ok(RagResponse {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert(
            "context".to_string(),
            prompt::format_context(&context_chunks),
        );
        vars.insert(
            "history".to_string(),
            prompt::format_history(history, self.history_window),
        );

        let user_prompt = self.prompts.render_with_custom(&self.prompts.rag.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.rag.system.clone())
                .build()
                .map_err(|e| LeseError::Generation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| LeseError::Generation(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.1)
            .build()
            .map_err(|e| LeseError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LeseError::Generation(format!("chat completion failed: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| LeseError::Generation("Empty response from LLM".to_string()))?
            .clone();

        let sources = prompt::distinct_sources(&context_chunks);
        debug!("Generated response with {} sources", sources.len());

        Ok(RagResponse { answer, sources })
    }

    /// Retrieve context without generating an answer (for the search surface).
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ContextChunk>> {
        self.context_builder.build(query).await
    }
}

/// A RAG response with answer and cited sources.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Distinct source documents, first-seen order.
    pub sources: Vec<String>,
}
