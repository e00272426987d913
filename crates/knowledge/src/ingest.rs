//! Source file loading and text extraction.
//!
//! Only the direct children of the documents directory are read. A file that
//! fails to parse aborts the whole ingestion.

use crate::types::Document;
use docqa_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Supported file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Docx,
    PlainText,
}

impl FileType {
    /// Detect file type from extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" | "doc" => Some(Self::Docx),
            "txt" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::PlainText => "text",
        }
    }
}

/// Load every supported file directly under `dir`, in file name order.
pub fn load_documents(dir: &Path) -> AppResult<Vec<Document>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read documents directory {:?}: {}", dir, e),
        ))
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::new();
    for path in &paths {
        match FileType::from_path(path) {
            Some(file_type) => {
                let loaded = load_file(path, file_type)?;
                tracing::debug!("Loaded {:?}: {} document(s)", path, loaded.len());
                documents.extend(loaded);
            }
            None => tracing::debug!("Skipping unsupported file: {:?}", path),
        }
    }

    tracing::info!(
        "Ingested {} document(s) from {} file(s) in {:?}",
        documents.len(),
        paths.len(),
        dir
    );

    Ok(documents)
}

/// Load a single file of a known type.
pub fn load_file(path: &Path, file_type: FileType) -> AppResult<Vec<Document>> {
    let ingest_err = |e: String| AppError::Ingest(format!("Failed to load {:?}: {}", path, e));

    match file_type {
        FileType::Pdf => {
            let pages = extract_pdf_pages(path).map_err(ingest_err)?;
            Ok(pages
                .into_iter()
                .enumerate()
                .map(|(page, content)| {
                    let mut doc = new_document(path, file_type, content);
                    doc.metadata.insert("page".to_string(), page.to_string());
                    doc
                })
                .collect())
        }
        FileType::Docx => {
            let content = extract_docx_text(path).map_err(ingest_err)?;
            Ok(vec![new_document(path, file_type, content)])
        }
        FileType::PlainText => {
            let bytes = fs::read(path).map_err(|e| ingest_err(e.to_string()))?;
            let content = String::from_utf8(bytes)
                .map_err(|e| ingest_err(format!("not valid UTF-8: {}", e)))?;
            Ok(vec![new_document(path, file_type, content)])
        }
    }
}

fn new_document(path: &Path, file_type: FileType, content: String) -> Document {
    let mut metadata = BTreeMap::new();
    metadata.insert("source".to_string(), path.display().to_string());
    metadata.insert("file_type".to_string(), file_type.as_str().to_string());

    Document {
        source: path.to_path_buf(),
        content,
        metadata,
    }
}

fn extract_pdf_pages(path: &Path) -> Result<Vec<String>, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;

    // pdf-extract panics on some malformed files
    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(&bytes))
        .map_err(|_| "PDF parser panicked".to_string())?
        .map_err(|e| e.to_string())
}

fn extract_docx_text(path: &Path) -> Result<String, String> {
    let file = fs::File::open(path).map_err(|e| e.to_string())?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| e.to_string())?;
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|e| format!("missing word/document.xml: {}", e))?;

    let mut xml = String::new();
    entry.read_to_string(&mut xml).map_err(|e| e.to_string())?;

    Ok(docx_xml_to_text(&xml))
}

/// Extract plain text from a WordprocessingML body.
///
/// Text runs (`<w:t>`) are concatenated, tabs and breaks are kept, and each
/// paragraph (`</w:p>`) ends with a newline.
pub fn docx_xml_to_text(xml: &str) -> String {
    let mut out = String::new();
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        let after = &rest[open + close + 1..];

        let name = tag
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("");

        match name {
            "w:t" if !tag.ends_with('/') => {
                let end = after.find("</w:t>").unwrap_or(after.len());
                out.push_str(&decode_entities(&after[..end]));
                rest = &after[end..];
                continue;
            }
            "w:tab" => out.push('\t'),
            "w:br" | "w:cr" => out.push('\n'),
            "/w:p" => out.push('\n'),
            _ => {}
        }

        rest = after;
    }

    out.trim_end().to_string()
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
