//! LLM integration crate for DocQA.
//!
//! This crate provides a provider-agnostic abstraction for chat completions.
//! Question answering and query expansion both go through [`LlmClient`].
//!
//! # Providers
//! - **OpenAI**: Chat Completions API (default)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use docqa_llm::{ChatMessage, LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new(vec![ChatMessage::user("Hello, world!")], "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{ChatMessage, ChatRole, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
