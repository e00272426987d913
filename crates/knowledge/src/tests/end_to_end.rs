//! Full pipeline: documents on disk to an answer.

use super::support::{FailingLlm, ScriptedLlm};
use crate::rag::{Answerer, MultiQueryRetriever, QuestionAnswerer};
use crate::{build_answerer, build_store};
use docqa_core::{AppConfig, AppError};
use docqa_llm::ChatRole;
use docqa_prompt::{load_prompt, ANSWER_PROMPT_ID, EXPAND_PROMPT_ID};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const ANSWER: &str = "  The sky is blue.\n\n(Based on the provided text.)  ";

fn offline_config(temp: &TempDir) -> AppConfig {
    let docs = temp.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("sky.txt"), "The sky is blue.").unwrap();

    let mut config = AppConfig::default();
    config.docs_dir = docs;
    config.data_dir = temp.path().join("data");
    config.embedding.provider = "trigram".to_string();
    config.embedding.dimensions = 256;
    config
}

fn answerer_with(config: &AppConfig, llm: Arc<dyn docqa_llm::LlmClient>, store: Arc<crate::VectorStore>) -> Answerer {
    let model = config.llm.models.chat.clone();
    let retriever = MultiQueryRetriever::new(
        llm.clone(),
        model.clone(),
        store,
        load_prompt(None, EXPAND_PROMPT_ID).unwrap(),
    )
    .with_top_k(config.retrieval.top_k);

    Answerer::new(
        retriever,
        llm,
        model,
        load_prompt(None, ANSWER_PROMPT_ID).unwrap(),
    )
}

#[tokio::test]
async fn test_sky_is_blue() {
    let temp = TempDir::new().unwrap();
    let config = offline_config(&temp);

    let store = Arc::new(build_store(&config).await.unwrap());
    assert!(config.index_path().exists());

    let llm = Arc::new(ScriptedLlm::new(
        "What is the color of the sky?\nWhich hue does the sky have?",
        ANSWER,
    ));
    let answerer = answerer_with(&config, llm.clone(), store);

    let result = answerer.answer("What color is the sky?", "").await.unwrap();

    // Answer is returned exactly as the model produced it
    assert_eq!(result.answer, ANSWER);
    assert!(result.context.contains("blue"));
    assert_eq!(result.chunks.len(), 1);

    let requests = llm.requests();
    assert_eq!(requests.len(), 2);

    let answer_request = &requests[1];
    assert_eq!(answer_request.model, "gpt-3.5-turbo-16k");
    assert_eq!(answer_request.temperature, Some(0.0));
    assert_eq!(answer_request.messages.len(), 2);
    assert_eq!(answer_request.messages[0].role, ChatRole::User);
    assert_eq!(
        answer_request.messages[0].content,
        " Here are the extracted information:\n\n```The sky is blue.```\n\nQuestion: What color is the sky?"
    );
    assert_eq!(answer_request.messages[1].role, ChatRole::Assistant);
    assert_eq!(answer_request.messages[1].content, "Response:");
}

#[tokio::test]
async fn test_instruction_prefixes_prompt() {
    let temp = TempDir::new().unwrap();
    let config = offline_config(&temp);
    let store = Arc::new(build_store(&config).await.unwrap());

    let llm = Arc::new(ScriptedLlm::new("sky color", "Blue."));
    let answerer = answerer_with(&config, llm.clone(), store);

    answerer
        .answer("What color is the sky?", "Answer briefly.")
        .await
        .unwrap();

    let requests = llm.requests();
    assert!(requests[1].messages[0]
        .content
        .starts_with("Answer briefly. Here are the extracted information:"));
}

#[tokio::test]
async fn test_rebuild_replaces_index() {
    let temp = TempDir::new().unwrap();
    let config = offline_config(&temp);

    build_store(&config).await.unwrap();

    fs::write(config.docs_dir.join("sky.txt"), "Grass is green.").unwrap();
    let store = build_store(&config).await.unwrap();

    let stats = store.stats().unwrap();
    assert_eq!(stats.chunks_count, 1);
    assert_eq!(stats.sources_count, 1);
    assert_eq!(stats.manifest.unwrap().embedding_model, "trigram-v1");

    let results = store.query("sky", 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.text, "Grass is green.");
}

#[tokio::test]
async fn test_chat_failure_surfaces() {
    let temp = TempDir::new().unwrap();
    let config = offline_config(&temp);
    let store = Arc::new(build_store(&config).await.unwrap());

    let answerer = answerer_with(&config, Arc::new(FailingLlm), store);
    let err = answerer.answer("What color is the sky?", "").await.unwrap_err();

    assert!(matches!(err, AppError::Llm(_)));
}

#[tokio::test]
async fn test_unreadable_docs_dir_aborts_build() {
    let temp = TempDir::new().unwrap();
    let mut config = offline_config(&temp);
    config.docs_dir = temp.path().join("missing");

    let err = build_store(&config).await.unwrap_err();
    assert!(matches!(err, AppError::Io(_)));
}

#[tokio::test]
async fn test_build_answerer_from_config() {
    let temp = TempDir::new().unwrap();
    let mut config = offline_config(&temp);
    config.llm.provider = "ollama".to_string();
    let store = Arc::new(build_store(&config).await.unwrap());

    assert!(build_answerer(&config, store.clone()).is_ok());

    config.llm.provider = "openai".to_string();
    config.llm.api_key = None;
    let err = build_answerer(&config, store).err().unwrap();
    assert!(matches!(err, AppError::Config(_)));
}

#[tokio::test]
async fn test_build_answerer_uses_prompt_override() {
    let temp = TempDir::new().unwrap();
    let mut config = offline_config(&temp);
    config.llm.provider = "ollama".to_string();

    let prompts = temp.path().join("prompts");
    fs::create_dir_all(&prompts).unwrap();
    fs::write(prompts.join("qa.answer.yml"), "id: qa.answer\n: [").unwrap();
    config.prompts_dir = Some(prompts.clone());

    let store = Arc::new(build_store(&config).await.unwrap());
    let err = build_answerer(&config, store.clone()).err().unwrap();
    assert!(matches!(err, AppError::Prompt(_)));

    fs::write(
        prompts.join("qa.answer.yml"),
        "id: qa.answer\ntitle: Short answers\napiVersion: \"1.0\"\ninput:\n  variables: [instruction, context, question]\nmessages:\n  - role: human\n    template: \"{{context}} {{question}}\"\n",
    )
    .unwrap();
    assert!(build_answerer(&config, store).is_ok());
}
