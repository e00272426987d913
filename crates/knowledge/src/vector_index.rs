//! Vector index abstraction for knowledge chunks.
//!
//! Defines a trait for provider-agnostic vector storage and retrieval.

use crate::types::{BuildManifest, IndexStats, IndexedChunk, ScoredChunk};
use docqa_core::AppResult;

/// Trait for vector index backends.
///
/// The index is rebuilt in full at startup and only read afterwards, so
/// mutating methods take `&mut self` while searches take `&self`.
pub trait VectorIndex: Send + Sync {
    /// Remove all chunks and the build manifest.
    fn reset(&mut self) -> AppResult<()>;

    /// Insert chunks with their embeddings in a single transaction.
    fn insert_batch(&mut self, chunks: &[IndexedChunk]) -> AppResult<()>;

    /// Search for the top-k most similar chunks to the query embedding.
    ///
    /// Returns chunks ordered by descending similarity score.
    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>>;

    /// Get statistics about the index.
    fn stats(&self) -> AppResult<IndexStats>;

    /// Record the manifest of a completed build.
    fn write_manifest(&mut self, manifest: &BuildManifest) -> AppResult<()>;

    /// Commit any pending changes (for backends that buffer writes).
    fn flush(&mut self) -> AppResult<()> {
        Ok(())
    }
}
