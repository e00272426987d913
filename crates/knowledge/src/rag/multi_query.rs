//! Query expansion and multi-query retrieval.

use super::to_chat_messages;
use crate::store::VectorStore;
use crate::types::ScoredChunk;
use docqa_core::config::ModelProfile;
use docqa_core::AppResult;
use docqa_llm::{LlmClient, LlmRequest};
use docqa_prompt::{build_prompt, PromptDefinition};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Retrieves chunks for a question using chat-generated query variants.
pub struct MultiQueryRetriever {
    llm: Arc<dyn LlmClient>,
    model: ModelProfile,
    store: Arc<VectorStore>,
    expand_prompt: PromptDefinition,
    top_k: usize,
    query_variants: usize,
    include_original: bool,
}

impl MultiQueryRetriever {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: ModelProfile,
        store: Arc<VectorStore>,
        expand_prompt: PromptDefinition,
    ) -> Self {
        Self {
            llm,
            model,
            store,
            expand_prompt,
            top_k: 4,
            query_variants: 3,
            include_original: false,
        }
    }

    /// Set the number of chunks fetched per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the number of variants requested from the chat model.
    pub fn with_query_variants(mut self, query_variants: usize) -> Self {
        self.query_variants = query_variants;
        self
    }

    /// Also search with the question itself.
    pub fn with_original_query(mut self, include: bool) -> Self {
        self.include_original = include;
        self
    }

    /// Ask the chat model for alternative phrasings of `question`.
    pub async fn generate_queries(&self, question: &str) -> AppResult<Vec<String>> {
        let mut queries = Vec::new();
        if self.include_original {
            queries.push(question.to_string());
        }

        if self.query_variants > 0 {
            let mut variables = HashMap::new();
            variables.insert("count".to_string(), self.query_variants.to_string());
            variables.insert("question".to_string(), question.to_string());
            let prompt = build_prompt(&self.expand_prompt, variables)?;

            let request = LlmRequest::new(to_chat_messages(&prompt)?, &self.model.model)
                .with_temperature(self.model.temperature);
            let response = self.llm.complete(&request).await?;

            for line in parse_query_lines(&response.content) {
                if !queries.contains(&line) {
                    queries.push(line);
                }
            }
        }

        if queries.is_empty() {
            tracing::warn!("Query expansion returned no queries, searching with the question");
            queries.push(question.to_string());
        }

        tracing::debug!("Generated queries: {:?}", queries);
        Ok(queries)
    }

    /// Retrieve the union of chunks for every query variant.
    ///
    /// Chunks are deduplicated by id and keep the order in which they were
    /// first returned.
    pub async fn retrieve(&self, question: &str) -> AppResult<Vec<ScoredChunk>> {
        let queries = self.generate_queries(question).await?;

        let mut seen = HashSet::new();
        let mut chunks = Vec::new();
        for query in &queries {
            for result in self.store.query(query, self.top_k).await? {
                if seen.insert(result.chunk.id.clone()) {
                    chunks.push(result);
                }
            }
        }

        tracing::info!(
            "Retrieved {} unique chunks from {} queries",
            chunks.len(),
            queries.len()
        );
        Ok(chunks)
    }
}

/// Split a model reply into one query per non-empty line.
///
/// Leading list markers such as `1.`, `2)`, `-` and `*` are removed.
pub fn parse_query_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
        return rest.trim_start();
    }

    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_lines() {
        let parsed = parse_query_lines("What is the sky's color?\n\nWhich hue does the sky have?\n");
        assert_eq!(
            parsed,
            vec!["What is the sky's color?", "Which hue does the sky have?"]
        );
    }

    #[test]
    fn test_parse_strips_list_markers() {
        let parsed = parse_query_lines("1. First\n2) Second\n- Third\n  * Fourth\n10. Fifth");
        assert_eq!(parsed, vec!["First", "Second", "Third", "Fourth", "Fifth"]);
    }

    #[test]
    fn test_parse_keeps_leading_numbers_in_text() {
        let parsed = parse_query_lines("2024 budget totals?");
        assert_eq!(parsed, vec!["2024 budget totals?"]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_query_lines("  \n\n").is_empty());
    }
}
