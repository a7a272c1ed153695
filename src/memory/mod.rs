//! Conversation memory for question-answer exchanges.
//!
//! An append-only, capacity-bounded log. The oldest exchanges are evicted
//! first once the configured maximum is exceeded; insertion order is
//! chronological order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One question/answer pair in the conversation log.
///
/// Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    /// The user's question.
    pub question: String,
    /// The generated answer.
    pub answer: String,
    /// Distinct source documents cited for the answer.
    pub sources: Vec<String>,
    /// When the exchange was created.
    pub timestamp: DateTime<Utc>,
}

impl Exchange {
    /// Create a new exchange stamped with the current time.
    pub fn new(question: String, answer: String, sources: Vec<String>) -> Self {
        Self {
            question,
            answer,
            sources,
            timestamp: Utc::now(),
        }
    }
}

/// Summary information about the conversation memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySummary {
    pub total_exchanges: usize,
    pub memory_empty: bool,
    pub memory_full: bool,
    pub latest_exchange_at: Option<DateTime<Utc>>,
}

/// Bounded, append-only conversation log.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    exchanges: std::collections::VecDeque<Exchange>,
    max_exchanges: usize,
}

impl ConversationMemory {
    /// Create a memory that retains at most `max_exchanges` entries.
    ///
    /// A maximum of zero is clamped to one.
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            exchanges: std::collections::VecDeque::new(),
            max_exchanges: max_exchanges.max(1),
        }
    }

    /// Append an exchange, evicting from the front past capacity.
    pub fn append(&mut self, exchange: Exchange) {
        self.exchanges.push_back(exchange);
        while self.exchanges.len() > self.max_exchanges {
            self.exchanges.pop_front();
        }
    }

    /// Last `n` exchanges in chronological order, `n` clamped to the length.
    pub fn recent(&self, n: usize) -> Vec<Exchange> {
        let skip = self.exchanges.len().saturating_sub(n);
        self.exchanges.iter().skip(skip).cloned().collect()
    }

    /// All exchanges whose question or answer contains the substring
    /// (case-insensitive), in chronological order.
    pub fn search(&self, substring: &str) -> Vec<Exchange> {
        let needle = substring.to_lowercase();
        self.exchanges
            .iter()
            .filter(|ex| {
                ex.question.to_lowercase().contains(&needle)
                    || ex.answer.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Empty the log.
    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    /// Full chronological log.
    pub fn all(&self) -> Vec<Exchange> {
        self.exchanges.iter().cloned().collect()
    }

    /// Current number of retained exchanges.
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Load a persisted log from `path`, or start empty when none exists.
    ///
    /// Entries beyond the capacity are evicted oldest-first during the load,
    /// so a lowered capacity takes effect immediately.
    pub fn load(path: &Path, max_exchanges: usize) -> crate::error::Result<Self> {
        let mut memory = Self::new(max_exchanges);

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let exchanges: Vec<Exchange> = serde_json::from_str(&content)?;
            for exchange in exchanges {
                memory.append(exchange);
            }
        }

        Ok(memory)
    }

    /// Persist the log as JSON at `path`.
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.all())?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Summarize the memory state.
    pub fn summary(&self) -> MemorySummary {
        MemorySummary {
            total_exchanges: self.exchanges.len(),
            memory_empty: self.exchanges.is_empty(),
            memory_full: self.exchanges.len() >= self.max_exchanges,
            latest_exchange_at: self.exchanges.back().map(|ex| ex.timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(question: &str, answer: &str) -> Exchange {
        Exchange::new(question.to_string(), answer.to_string(), Vec::new())
    }

    #[test]
    fn test_append_and_all_preserve_order() {
        let mut memory = ConversationMemory::new(10);
        memory.append(exchange("first?", "one"));
        memory.append(exchange("second?", "two"));
        memory.append(exchange("third?", "three"));

        let all = memory.all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].question, "first?");
        assert_eq!(all[2].question, "third?");
    }

    #[test]
    fn test_eviction_drops_exactly_the_oldest() {
        let mut memory = ConversationMemory::new(3);
        for i in 0..5 {
            memory.append(exchange(&format!("q{}", i), "a"));
        }

        let all = memory.all();
        assert_eq!(all.len(), 3);
        let questions: Vec<&str> = all.iter().map(|ex| ex.question.as_str()).collect();
        assert_eq!(questions, vec!["q2", "q3", "q4"]);
    }

    #[test]
    fn test_recent_clamps_to_length() {
        let mut memory = ConversationMemory::new(10);
        memory.append(exchange("q0", "a"));
        memory.append(exchange("q1", "a"));

        let recent = memory.recent(5);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].question, "q0");

        let recent = memory.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].question, "q1");
    }

    #[test]
    fn test_search_is_case_insensitive_and_complete() {
        let mut memory = ConversationMemory::new(10);
        memory.append(exchange("What is Foo?", "Foo is a placeholder."));
        memory.append(exchange("What is bar?", "Unrelated."));
        memory.append(exchange("Anything else?", "See the FOO section."));

        let hits = memory.search("foo");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].question, "What is Foo?");
        assert_eq!(hits[1].question, "Anything else?");

        assert!(memory.search("missing").is_empty());
    }

    #[test]
    fn test_clear_then_all_is_empty() {
        let mut memory = ConversationMemory::new(10);
        memory.append(exchange("q", "a"));
        memory.clear();
        assert!(memory.all().is_empty());
        assert!(memory.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut memory = ConversationMemory::new(0);
        memory.append(exchange("q", "a"));
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let mut memory = ConversationMemory::new(10);
        memory.append(exchange("q0", "a0"));
        memory.append(exchange("q1", "a1"));
        memory.save(&path).unwrap();

        let loaded = ConversationMemory::load(&path, 10).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.all()[0].question, "q0");
        assert_eq!(loaded.all()[1].answer, "a1");
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let memory = ConversationMemory::load(&dir.path().join("absent.json"), 5).unwrap();
        assert!(memory.is_empty());
    }

    #[test]
    fn test_load_clamps_to_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let mut memory = ConversationMemory::new(10);
        for i in 0..5 {
            memory.append(exchange(&format!("q{}", i), "a"));
        }
        memory.save(&path).unwrap();

        let loaded = ConversationMemory::load(&path, 2).unwrap();
        let questions: Vec<String> = loaded.all().iter().map(|ex| ex.question.clone()).collect();
        assert_eq!(questions, vec!["q3", "q4"]);
    }

    #[test]
    fn test_summary() {
        let mut memory = ConversationMemory::new(2);
        let summary = memory.summary();
        assert!(summary.memory_empty);
        assert!(summary.latest_exchange_at.is_none());

        memory.append(exchange("q0", "a"));
        memory.append(exchange("q1", "a"));
        let summary = memory.summary();
        assert_eq!(summary.total_exchanges, 2);
        assert!(summary.memory_full);
        assert!(summary.latest_exchange_at.is_some());
    }
}
