//! Token-window chunking with fixed size and overlap.
//!
//! Tokens are counted with the `cl100k_base` encoding, the tokenizer of the
//! OpenAI embedding models, so chunk sizes line up with embedding limits.

use crate::types::{Chunk, Document};
use docqa_core::{AppError, AppResult};
use tiktoken_rs::CoreBPE;

/// How far a window edge may move to reach a decodable boundary.
const MAX_BOUNDARY_SHIFT: usize = 3;

/// Splits documents into overlapping windows of at most `chunk_size` tokens.
pub struct TokenChunker {
    bpe: CoreBPE,
    chunk_size: usize,
    overlap: usize,
}

impl TokenChunker {
    /// Create a chunker. `overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "Invalid chunking: size {} must exceed overlap {}",
                chunk_size, overlap
            )));
        }

        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| AppError::Ingest(format!("Failed to load tokenizer: {}", e)))?;

        Ok(Self {
            bpe,
            chunk_size,
            overlap,
        })
    }

    /// Number of tokens in `text`.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Chunk every document, preserving document order.
    pub fn split_documents(&self, documents: &[Document]) -> AppResult<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for (index, document) in documents.iter().enumerate() {
            chunks.extend(self.split_document(index, document)?);
        }

        tracing::info!(
            "Chunked {} document(s) into {} chunk(s) (size: {}, overlap: {})",
            documents.len(),
            chunks.len(),
            self.chunk_size,
            self.overlap
        );

        Ok(chunks)
    }

    /// Chunk a single document.
    ///
    /// Consecutive windows share exactly `overlap` tokens. The last window
    /// ends at the end of the document.
    pub fn split_document(&self, source_index: usize, document: &Document) -> AppResult<Vec<Chunk>> {
        if document.content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tokens = self.bpe.encode_ordinary(&document.content);
        let stride = self.chunk_size - self.overlap;
        let source = document.source.display().to_string();

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut position = 0u32;

        loop {
            let end = (start + self.chunk_size).min(tokens.len());
            let (token_start, token_end, text) = narrow_window(start, end, |s, e| {
                self.bpe.decode(tokens[s..e].to_vec()).ok()
            })?;

            let mut metadata = serde_json::Map::new();
            for (key, value) in &document.metadata {
                metadata.insert(key.clone(), serde_json::Value::String(value.clone()));
            }
            metadata.insert("token_start".to_string(), token_start.into());
            metadata.insert("token_end".to_string(), token_end.into());

            chunks.push(Chunk {
                id: format!("{}-{}", source_index, position),
                source_index,
                source: source.clone(),
                position,
                text,
                token_count: token_end - token_start,
                metadata: serde_json::Value::Object(metadata),
            });

            if end == tokens.len() {
                break;
            }
            start += stride;
            position += 1;
        }

        tracing::debug!("Chunked {:?} into {} chunk(s)", document.source, chunks.len());

        Ok(chunks)
    }
}

/// Find the widest decodable window inside `start..end`, moving each edge
/// inward by at most `MAX_BOUNDARY_SHIFT` tokens.
fn narrow_window<F>(start: usize, end: usize, decode: F) -> AppResult<(usize, usize, String)>
where
    F: Fn(usize, usize) -> Option<String>,
{
    for shift in 0..=2 * MAX_BOUNDARY_SHIFT {
        for shift_start in 0..=shift.min(MAX_BOUNDARY_SHIFT) {
            let shift_end = shift - shift_start;
            if shift_end > MAX_BOUNDARY_SHIFT {
                continue;
            }

            let s = start + shift_start;
            let e = end.saturating_sub(shift_end);
            if s >= e {
                continue;
            }
            if let Some(text) = decode(s, e) {
                return Ok((s, e, text));
            }
        }
    }

    Err(AppError::Ingest(format!(
        "Token window {}..{} cannot be decoded as UTF-8",
        start, end
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn doc(content: &str) -> Document {
        let mut metadata = BTreeMap::new();
        metadata.insert("source".to_string(), "docs/test.txt".to_string());
        Document {
            source: PathBuf::from("docs/test.txt"),
            content: content.to_string(),
            metadata,
        }
    }

    fn token_range(chunk: &Chunk) -> (u64, u64) {
        (
            chunk.metadata["token_start"].as_u64().unwrap(),
            chunk.metadata["token_end"].as_u64().unwrap(),
        )
    }

    #[test]
    fn test_rejects_overlap_not_below_size() {
        assert!(TokenChunker::new(50, 50).is_err());
        assert!(TokenChunker::new(0, 0).is_err());
    }

    #[test]
    fn test_short_document_single_chunk() {
        let chunker = TokenChunker::new(300, 50).unwrap();
        let chunks = chunker.split_document(0, &doc("The sky is blue.")).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "0-0");
        assert_eq!(chunks[0].text, "The sky is blue.");
        assert_eq!(chunks[0].source, "docs/test.txt");
        assert_eq!(chunks[0].metadata["source"], "docs/test.txt");
    }

    #[test]
    fn test_whitespace_document_has_no_chunks() {
        let chunker = TokenChunker::new(300, 50).unwrap();
        assert!(chunker.split_document(0, &doc("  \n\t ")).unwrap().is_empty());
        assert!(chunker.split_document(0, &doc("")).unwrap().is_empty());
    }

    #[test]
    fn test_windows_bounded_and_overlapping() {
        let chunker = TokenChunker::new(300, 50).unwrap();
        let content: String = (0..1500).map(|i| format!("word{} ", i)).collect();
        let total = chunker.count_tokens(&content) as u64;

        let chunks = chunker.split_document(3, &doc(&content)).unwrap();
        assert!(chunks.len() > 2);

        for chunk in &chunks {
            assert!(chunk.token_count <= 300);
            assert!(chunk.id.starts_with("3-"));
        }

        for pair in chunks.windows(2) {
            let (_, prev_end) = token_range(&pair[0]);
            let (next_start, _) = token_range(&pair[1]);
            assert_eq!(prev_end - next_start, 50);
            assert_eq!(pair[1].position, pair[0].position + 1);
        }

        let (_, last_end) = token_range(chunks.last().unwrap());
        assert_eq!(last_end, total);
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let chunker = TokenChunker::new(40, 10).unwrap();
        let docs = vec![
            doc(&"Alpha beta gamma delta. ".repeat(30)),
            doc(&"Rust ownership rules. ".repeat(25)),
        ];

        let first = chunker.split_documents(&docs).unwrap();
        let second = chunker.split_documents(&docs).unwrap();
        assert_eq!(first, second);
        assert!(first.iter().any(|c| c.source_index == 1));
    }

    #[test]
    fn test_multibyte_text_stays_valid() {
        let chunker = TokenChunker::new(20, 5).unwrap();
        let content = "日本語のテキスト🎉と絵文字🚀を含む文章。".repeat(15);

        let chunks = chunker.split_document(0, &doc(&content)).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.text.is_empty());
            assert!(chunk.token_count <= 20);
            assert!(!chunk.text.contains('\u{FFFD}'));
        }
    }

    #[test]
    fn test_narrow_window_prefers_smallest_shift() {
        let result = narrow_window(0, 10, |_, e| (e <= 8).then(|| format!("..{}", e))).unwrap();
        assert_eq!((result.0, result.1), (0, 8));

        let result = narrow_window(0, 10, |s, _| (s >= 1).then(String::new)).unwrap();
        assert_eq!((result.0, result.1), (1, 10));
    }

    #[test]
    fn test_narrow_window_gives_up() {
        assert!(matches!(
            narrow_window(0, 10, |_, _| None),
            Err(AppError::Ingest(_))
        ));
    }
}
