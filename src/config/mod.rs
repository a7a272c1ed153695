//! Configuration module for Lese.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, IngestionSettings, MemorySettings, PromptSettings,
    RagSettings, Settings, VectorStoreSettings,
};
