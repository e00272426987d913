//! Document knowledge base for question answering.
//!
//! Ingests local documents, splits them into token windows, embeds them into
//! a SQLite-persisted vector index and answers questions over it with
//! multi-query retrieval.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod rag;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::TokenChunker;
pub use index::SqliteIndex;
pub use rag::{Answerer, MultiQueryRetriever, QuestionAnswerer};
pub use store::VectorStore;
pub use types::{
    BuildManifest, Chunk, Document, IndexStats, IndexedChunk, RagAnswer, ScoredChunk,
};
pub use vector_index::VectorIndex;

use docqa_core::{AppConfig, AppResult};
use docqa_llm::create_client;
use docqa_prompt::{list_prompts, load_prompt, ANSWER_PROMPT_ID, EXPAND_PROMPT_ID};
use std::sync::Arc;
use std::time::Instant;

/// Ingest the documents directory and build a fresh, persisted vector store.
///
/// Any ingestion failure aborts the build.
pub async fn build_store(config: &AppConfig) -> AppResult<VectorStore> {
    let start = Instant::now();

    tracing::info!("Building vector index from {:?}", config.docs_dir);

    let documents = ingest::load_documents(&config.docs_dir)?;

    let chunker = TokenChunker::new(
        config.retrieval.chunk_size,
        config.retrieval.chunk_overlap,
    )?;
    let chunks = chunker.split_documents(&documents)?;

    if chunks.is_empty() {
        tracing::warn!("No text found in {:?}; answers will have no context", config.docs_dir);
    }

    let embedder =
        embeddings::create_provider(&config.embedding, config.llm.api_key.as_deref())?;

    config.ensure_data_dir()?;
    let index = SqliteIndex::open(&config.index_path())?;

    let mut store = VectorStore::build(
        chunks,
        embedder,
        Box::new(index),
        config.embedding.batch_size,
    )
    .await?;
    store.persist()?;

    tracing::info!(
        "Vector index ready: {} documents, {} chunks in {}ms",
        documents.len(),
        store.manifest().chunk_count,
        start.elapsed().as_millis()
    );

    Ok(store)
}

/// Wire the chat client, prompts and retriever into an [`Answerer`].
pub fn build_answerer(config: &AppConfig, store: Arc<VectorStore>) -> AppResult<Answerer> {
    let llm = create_client(
        &config.llm.provider,
        config.llm.endpoint.as_deref(),
        config.llm.api_key.as_deref(),
    )?;

    let prompts_dir = config.prompts_dir.as_deref();
    tracing::debug!("Available prompts: {:?}", list_prompts(prompts_dir)?);
    let expand_prompt = load_prompt(prompts_dir, EXPAND_PROMPT_ID)?;
    let answer_prompt = load_prompt(prompts_dir, ANSWER_PROMPT_ID)?;

    let model = config.llm.models.chat.clone();
    tracing::debug!(
        "Answering with {} via {} (temperature {})",
        model.model,
        llm.provider_name(),
        model.temperature
    );

    let retriever = MultiQueryRetriever::new(llm.clone(), model.clone(), store, expand_prompt)
        .with_top_k(config.retrieval.top_k)
        .with_query_variants(config.retrieval.query_variants)
        .with_original_query(config.retrieval.include_original_query);

    Ok(Answerer::new(retriever, llm, model, answer_prompt))
}
