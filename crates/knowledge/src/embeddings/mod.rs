//! Embedding providers.
//!
//! Turns chunk and query text into vectors for similarity search.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{OllamaProvider, OpenAiEmbeddingProvider, TrigramProvider};
