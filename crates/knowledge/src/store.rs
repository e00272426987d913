//! Embedded chunk store: an embedding provider paired with a vector index.

use crate::embeddings::EmbeddingProvider;
use crate::types::{BuildManifest, Chunk, IndexStats, IndexedChunk, ScoredChunk};
use crate::vector_index::VectorIndex;
use chrono::Utc;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;

/// Searchable store of embedded chunks.
///
/// Queries are embedded with the same provider that embedded the chunks.
pub struct VectorStore {
    index: Box<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    manifest: BuildManifest,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("embedder", &self.embedder)
            .field("manifest", &self.manifest)
            .finish()
    }
}

impl VectorStore {
    /// Embed every chunk and load the results into `index`.
    ///
    /// The index is reset first. Chunks are inserted only after every batch
    /// embedded successfully, so a failed build leaves the index empty.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: Arc<dyn EmbeddingProvider>,
        mut index: Box<dyn VectorIndex>,
        batch_size: usize,
    ) -> AppResult<Self> {
        index.reset()?;

        let batch_size = batch_size.max(1);
        let mut indexed = Vec::with_capacity(chunks.len());
        let mut dimensions: Option<usize> = None;

        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "Embedding provider returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                )));
            }

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                match dimensions {
                    None => dimensions = Some(embedding.len()),
                    Some(expected) if expected != embedding.len() => {
                        return Err(AppError::Embedding(format!(
                            "Inconsistent embedding dimensions: expected {}, got {} for chunk {}",
                            expected,
                            embedding.len(),
                            chunk.id
                        )));
                    }
                    Some(_) => {}
                }
                indexed.push(IndexedChunk {
                    chunk: chunk.clone(),
                    embedding,
                });
            }

            tracing::debug!("Embedded {}/{} chunks", indexed.len(), chunks.len());
        }

        index.insert_batch(&indexed)?;

        let manifest = BuildManifest {
            embedding_model: embedder.model_name().to_string(),
            dimensions: dimensions.unwrap_or_else(|| embedder.dimensions()),
            chunk_count: indexed.len(),
            built_at: Utc::now(),
        };

        tracing::info!(
            "Embedded {} chunks with {} ({} dimensions)",
            manifest.chunk_count,
            manifest.embedding_model,
            manifest.dimensions
        );

        Ok(Self {
            index,
            embedder,
            manifest,
        })
    }

    /// Record the build manifest and flush the index to durable storage.
    pub fn persist(&mut self) -> AppResult<()> {
        self.manifest.built_at = Utc::now();
        self.index.write_manifest(&self.manifest)?;
        self.index.flush()?;

        tracing::info!("Persisted vector index ({} chunks)", self.manifest.chunk_count);
        Ok(())
    }

    /// Return up to `k` chunks most similar to `text`, best first.
    pub async fn query(&self, text: &str, k: usize) -> AppResult<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(text).await?;
        self.index.search(&embedding, k)
    }

    pub fn stats(&self) -> AppResult<IndexStats> {
        self.index.stats()
    }

    pub fn manifest(&self) -> &BuildManifest {
        &self.manifest
    }
}
