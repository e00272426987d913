//! SQLite-backed vector index for knowledge chunks.

use crate::types::{BuildManifest, Chunk, IndexStats, IndexedChunk, ScoredChunk};
use crate::vector_index::VectorIndex;
use chrono::{DateTime, Utc};
use docqa_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    source_index INTEGER NOT NULL,
    source TEXT NOT NULL,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    token_count INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    metadata TEXT
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Vector index stored in a single SQLite file.
///
/// Search is a full cosine-similarity scan, which is adequate for the few
/// thousand chunks of a local document folder. Stored rows are mirrored in
/// memory whenever the index changes, so searches never touch the
/// connection.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    rows: Vec<IndexedChunk>,
}

impl SqliteIndex {
    /// Open (or create) the index database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;

        let index = Self::with_connection(conn, Some(db_path.to_path_buf()))?;
        tracing::debug!("Initialized SQLite index at {:?}", db_path);
        Ok(index)
    }

    /// Create a transient index that lives only in memory.
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Index(format!("Failed to open in-memory index: {}", e)))?;
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;
        let rows = load_rows(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
            rows,
        })
    }

    /// Path of the database file, if persisted on disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Index("Index connection lock poisoned".to_string()))
    }

    fn conn_mut(&mut self) -> AppResult<&mut Connection> {
        self.conn
            .get_mut()
            .map_err(|_| AppError::Index("Index connection lock poisoned".to_string()))
    }
}

impl VectorIndex for SqliteIndex {
    fn reset(&mut self) -> AppResult<()> {
        let conn = self.conn_mut()?;
        conn.execute_batch("DELETE FROM chunks; DELETE FROM meta;")
            .map_err(|e| AppError::Index(format!("Failed to reset index: {}", e)))?;
        self.rows.clear();

        tracing::debug!("Reset vector index");
        Ok(())
    }

    fn insert_batch(&mut self, chunks: &[IndexedChunk]) -> AppResult<()> {
        let conn = self.conn_mut()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Index(format!("Failed to begin transaction: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO chunks
                     (id, source_index, source, position, text, token_count, embedding, metadata)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(|e| AppError::Index(format!("Failed to prepare insert: {}", e)))?;

            for item in chunks {
                let chunk = &item.chunk;
                let metadata_json = serde_json::to_string(&chunk.metadata)?;

                stmt.execute(params![
                    chunk.id,
                    chunk.source_index as i64,
                    chunk.source,
                    chunk.position as i64,
                    chunk.text,
                    chunk.token_count as i64,
                    embedding_to_bytes(&item.embedding),
                    metadata_json,
                ])
                .map_err(|e| AppError::Index(format!("Failed to insert chunk {}: {}", chunk.id, e)))?;
            }
        }

        tx.commit()
            .map_err(|e| AppError::Index(format!("Failed to commit chunks: {}", e)))?;

        let rows = load_rows(conn)?;
        self.rows = rows;

        tracing::debug!("Inserted {} chunks", chunks.len());
        Ok(())
    }

    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<ScoredChunk> = self
            .rows
            .iter()
            .map(|row| ScoredChunk {
                chunk: row.chunk.clone(),
                score: cosine_similarity(query_embedding, &row.embedding),
            })
            .collect();

        // Sort by score descending; ties keep insertion order
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results)
    }

    fn stats(&self) -> AppResult<IndexStats> {
        let conn = self.lock()?;

        let (chunks_count, sources_count): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), COUNT(DISTINCT source) FROM chunks",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| AppError::Index(format!("Failed to count chunks: {}", e)))?;

        let manifest = read_manifest(&conn)?;

        Ok(IndexStats {
            sources_count: sources_count as u32,
            chunks_count: chunks_count as u32,
            manifest,
        })
    }

    fn write_manifest(&mut self, manifest: &BuildManifest) -> AppResult<()> {
        let conn = self.conn_mut()?;
        let entries = [
            ("embedding_model", manifest.embedding_model.clone()),
            ("dimensions", manifest.dimensions.to_string()),
            ("chunk_count", manifest.chunk_count.to_string()),
            ("built_at", manifest.built_at.to_rfc3339()),
        ];

        let tx = conn
            .transaction()
            .map_err(|e| AppError::Index(format!("Failed to begin transaction: {}", e)))?;
        for (key, value) in entries {
            tx.execute(
                "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(|e| AppError::Index(format!("Failed to write manifest: {}", e)))?;
        }
        tx.commit()
            .map_err(|e| AppError::Index(format!("Failed to commit manifest: {}", e)))?;

        Ok(())
    }

    fn flush(&mut self) -> AppResult<()> {
        let conn = self.conn_mut()?;
        conn.cache_flush()
            .map_err(|e| AppError::Index(format!("Failed to flush index: {}", e)))?;
        Ok(())
    }
}

/// Read every stored chunk with its embedding, in insertion order.
fn load_rows(conn: &Connection) -> AppResult<Vec<IndexedChunk>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, source_index, source, position, text, token_count, embedding, metadata
             FROM chunks ORDER BY rowid",
        )
        .map_err(|e| AppError::Index(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(6)?;
            let metadata_json: Option<String> = row.get(7)?;
            let chunk = Chunk {
                id: row.get(0)?,
                source_index: row.get::<_, i64>(1)? as usize,
                source: row.get(2)?,
                position: row.get::<_, i64>(3)? as u32,
                text: row.get(4)?,
                token_count: row.get::<_, i64>(5)? as usize,
                metadata: serde_json::Value::Null,
            };
            Ok((chunk, embedding_bytes, metadata_json))
        })
        .map_err(|e| AppError::Index(format!("Failed to query chunks: {}", e)))?;

    let mut loaded = Vec::new();
    for row in rows {
        let (mut chunk, embedding_bytes, metadata_json) =
            row.map_err(|e| AppError::Index(format!("Failed to read chunk: {}", e)))?;

        if let Some(json) = metadata_json {
            chunk.metadata = serde_json::from_str(&json)?;
        }
        loaded.push(IndexedChunk {
            chunk,
            embedding: bytes_to_embedding(&embedding_bytes)?,
        });
    }

    Ok(loaded)
}

fn read_manifest(conn: &Connection) -> AppResult<Option<BuildManifest>> {
    let get = |key: &str| -> AppResult<Option<String>> {
        conn.query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| AppError::Index(format!("Failed to read manifest: {}", e)))
    };

    let (Some(model), Some(dimensions), Some(chunk_count), Some(built_at)) = (
        get("embedding_model")?,
        get("dimensions")?,
        get("chunk_count")?,
        get("built_at")?,
    ) else {
        return Ok(None);
    };

    let parse_err = |field: &str| AppError::Index(format!("Corrupt manifest field '{}'", field));

    Ok(Some(BuildManifest {
        embedding_model: model,
        dimensions: dimensions.parse().map_err(|_| parse_err("dimensions"))?,
        chunk_count: chunk_count.parse().map_err(|_| parse_err("chunk_count"))?,
        built_at: DateTime::parse_from_rfc3339(&built_at)
            .map_err(|_| parse_err("built_at"))?
            .with_timezone(&Utc),
    }))
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
