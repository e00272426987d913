//! Retrieval-augmented answering over the vector store.

use super::multi_query::MultiQueryRetriever;
use super::{to_chat_messages, QuestionAnswerer};
use crate::types::RagAnswer;
use async_trait::async_trait;
use docqa_core::config::ModelProfile;
use docqa_core::AppResult;
use docqa_llm::{LlmClient, LlmRequest};
use docqa_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Instrument;

/// Answers questions from retrieved document context.
pub struct Answerer {
    retriever: MultiQueryRetriever,
    llm: Arc<dyn LlmClient>,
    model: ModelProfile,
    answer_prompt: PromptDefinition,
}

impl Answerer {
    pub fn new(
        retriever: MultiQueryRetriever,
        llm: Arc<dyn LlmClient>,
        model: ModelProfile,
        answer_prompt: PromptDefinition,
    ) -> Self {
        Self {
            retriever,
            llm,
            model,
            answer_prompt,
        }
    }

    async fn answer_inner(&self, question: &str, instruction: &str) -> AppResult<RagAnswer> {
        let chunks = self.retriever.retrieve(question).await?;

        let context = chunks
            .iter()
            .map(|scored| scored.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let mut variables = HashMap::new();
        variables.insert("instruction".to_string(), instruction.to_string());
        variables.insert("context".to_string(), context.clone());
        variables.insert("question".to_string(), question.to_string());
        let prompt = build_prompt(&self.answer_prompt, variables)?;

        let request = LlmRequest::new(to_chat_messages(&prompt)?, &self.model.model)
            .with_temperature(self.model.temperature);
        let response = self.llm.complete(&request).await?;

        tracing::info!(
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Answer generated"
        );

        Ok(RagAnswer {
            context,
            answer: response.content,
            chunks,
        })
    }
}

#[async_trait]
impl QuestionAnswerer for Answerer {
    async fn answer(&self, question: &str, instruction: &str) -> AppResult<RagAnswer> {
        let span = tracing::info_span!("question", question = %question);
        self.answer_inner(question, instruction)
            .instrument(span)
            .await
    }
}
