//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A text fragment extracted from one source file.
///
/// PDFs yield one Document per page; every other format yields one per file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Path of the file the text came from
    pub source: PathBuf,

    /// Extracted plain text
    pub content: String,

    /// Loader metadata (`source`, `file_type`, `page` for PDFs)
    pub metadata: BTreeMap<String, String>,
}

/// A bounded token window of a Document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic identifier `<doc-index>-<position>`
    pub id: String,

    /// Index of the owning Document in the ingestion order
    pub source_index: usize,

    /// Path of the owning Document
    pub source: String,

    /// Position within the owning Document
    pub position: u32,

    /// Text content
    pub text: String,

    /// Number of tokens in the window
    pub token_count: usize,

    /// Document metadata plus `token_start`/`token_end`
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A chunk paired with its embedding, ready for insertion.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,

    /// Cosine similarity with the query embedding
    pub score: f32,
}

/// Record written after a full index build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub embedding_model: String,
    pub dimensions: usize,
    pub chunk_count: usize,
    pub built_at: DateTime<Utc>,
}

/// Statistics for a vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of distinct source paths
    pub sources_count: u32,

    /// Number of chunks
    pub chunks_count: u32,

    /// Manifest of the last persisted build, if any
    pub manifest: Option<BuildManifest>,
}

/// Result of answering one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    /// Retrieved chunk texts joined with newlines
    pub context: String,

    /// Chat model response, verbatim
    pub answer: String,

    /// Retrieved chunks in retrieval order
    pub chunks: Vec<ScoredChunk>,
}
