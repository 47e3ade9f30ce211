//! Configuration module for Lectern.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AssistantPrompts, Prompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, ModelProvider, ModelSettings, PromptSettings,
    RagSettings, Settings, VectorStoreSettings,
};
