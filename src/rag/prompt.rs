//! Prompt assembly for RAG responses.
//!
//! Pure functions from retrieved chunks and conversation history to the
//! prompt blocks the engine substitutes into its templates, so the
//! assembly is testable without any API calls.

use super::ContextChunk;
use crate::memory::Exchange;

/// Answers from prior exchanges are truncated to this many characters in
/// the history block to keep the prompt bounded.
const HISTORY_ANSWER_PREVIEW_CHARS: usize = 200;

/// Format retrieved chunks for inclusion in a prompt, labeled with their
/// source document.
pub fn format_context(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("---\n[{}]\n{}\n---", chunk.source_document, chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format a bounded window of prior exchanges, most recent `window` entries
/// in chronological order.
pub fn format_history(history: &[Exchange], window: usize) -> String {
    if history.is_empty() || window == 0 {
        return "No previous conversation.".to_string();
    }

    let skip = history.len().saturating_sub(window);
    history[skip..]
        .iter()
        .map(|ex| {
            let preview: String = ex.answer.chars().take(HISTORY_ANSWER_PREVIEW_CHARS).collect();
            let ellipsis = if ex.answer.chars().count() > HISTORY_ANSWER_PREVIEW_CHARS {
                "..."
            } else {
                ""
            };
            format!("Q: {}\nA: {}{}", ex.question, preview, ellipsis)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Distinct source documents among retrieved chunks, first-seen order.
pub fn distinct_sources(chunks: &[ContextChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for chunk in chunks {
        if !sources.contains(&chunk.source_document) {
            sources.push(chunk.source_document.clone());
        }
    }
    sources
}
