//! Retrieval-augmented answering.
//!
//! A question is expanded into several retrieval queries, the retrieved
//! chunks become the context of a single templated prompt, and the chat
//! model's reply is returned unchanged.

pub mod answer;
pub mod multi_query;

pub use answer::Answerer;
pub use multi_query::{parse_query_lines, MultiQueryRetriever};

use crate::types::RagAnswer;
use async_trait::async_trait;
use docqa_core::{AppError, AppResult};
use docqa_llm::{ChatMessage, ChatRole};
use docqa_prompt::BuiltPrompt;

/// Anything that can answer a question about the indexed documents.
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    /// Answer `question`, prefixing the prompt with `instruction` (may be empty).
    async fn answer(&self, question: &str, instruction: &str) -> AppResult<RagAnswer>;
}

/// Convert rendered prompt messages into chat messages.
pub(crate) fn to_chat_messages(prompt: &BuiltPrompt) -> AppResult<Vec<ChatMessage>> {
    prompt
        .messages
        .iter()
        .map(|message| -> AppResult<ChatMessage> {
            let role = ChatRole::parse(&message.role).ok_or_else(|| {
                AppError::Prompt(format!(
                    "Prompt {} has unsupported role '{}'",
                    prompt.metadata.source_prompt_id, message.role
                ))
            })?;
            Ok(ChatMessage::new(role, message.content.clone()))
        })
        .collect()
}
