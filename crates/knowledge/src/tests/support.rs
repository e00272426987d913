//! Substitute services for tests.

use crate::chunker::TokenChunker;
use crate::embeddings::TrigramProvider;
use crate::index::SqliteIndex;
use crate::store::VectorStore;
use crate::types::Document;
use async_trait::async_trait;
use docqa_core::{AppError, AppResult};
use docqa_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Chat client that replies from a script and records every request.
///
/// Requests built from the query expansion prompt get `expansions`; all
/// others get `answer`.
pub struct ScriptedLlm {
    expansions: String,
    answer: String,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(expansions: &str, answer: &str) -> Self {
        Self {
            expansions: expansions.to_string(),
            answer: answer.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let is_expansion = request
            .messages
            .iter()
            .any(|m| m.content.contains("Original question:"));
        let content = if is_expansion {
            self.expansions.clone()
        } else {
            self.answer.clone()
        };

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::new(10, 5),
        })
    }
}

/// Chat client whose every call fails.
pub struct FailingLlm;

#[async_trait]
impl LlmClient for FailingLlm {
    fn provider_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        Err(AppError::Llm("service unavailable".to_string()))
    }
}

/// Build an in-memory store with one document per text.
pub async fn store_from_texts(texts: &[&str]) -> Arc<VectorStore> {
    let documents: Vec<Document> = texts
        .iter()
        .enumerate()
        .map(|(i, text)| Document {
            source: PathBuf::from(format!("doc{}.txt", i)),
            content: text.to_string(),
            metadata: BTreeMap::new(),
        })
        .collect();

    let chunks = TokenChunker::new(300, 50)
        .unwrap()
        .split_documents(&documents)
        .unwrap();

    let store = VectorStore::build(
        chunks,
        Arc::new(TrigramProvider::new(512)),
        Box::new(SqliteIndex::in_memory().unwrap()),
        16,
    )
    .await
    .unwrap();

    Arc::new(store)
}
