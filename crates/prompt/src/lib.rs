//! Prompt system for DocQA.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions made of role-tagged messages
//! - Built-in `qa.answer` and `qa.expand` prompts compiled into the binary
//! - Per-deployment overrides loaded from a prompts directory
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt, ANSWER_PROMPT_ID, EXPAND_PROMPT_ID};
pub use types::{
    BuiltMessage, BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptInputSpec,
    PromptMessage, PromptOutputSpec,
};
