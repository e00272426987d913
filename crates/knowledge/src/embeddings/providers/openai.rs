//! OpenAI embeddings provider.
//!
//! POSTs batches of texts to `{base}/embeddings` and returns vectors in
//! input order.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use docqa_core::config::EmbeddingSettings;
use docqa_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: impl Into<String>, settings: &EmbeddingSettings) -> Self {
        let base_url = settings
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_URL)
            .trim_end_matches('/')
            .to_string();

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url,
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            batch_size: settings.batch_size.max(1),
        }
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len()))]
    async fn embed_request(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to OpenAI: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorEnvelope>(&error_text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(error_text);
            return Err(AppError::Embedding(format!(
                "OpenAI API error ({}): {}",
                status, message
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse OpenAI response: {}", e)))?;

        order_embeddings(body, texts.len())
    }
}

/// Put returned vectors back into request order and check the count.
fn order_embeddings(body: EmbeddingResponse, expected: usize) -> AppResult<Vec<Vec<f32>>> {
    let mut data = body.data;
    if data.len() != expected {
        return Err(AppError::Embedding(format!(
            "OpenAI returned {} embeddings for {} inputs",
            data.len(),
            expected
        )));
    }

    data.sort_by_key(|item| item.index);
    Ok(data.into_iter().map(|item| item.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_request(batch).await?);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_embeddings_by_index() {
        let body: EmbeddingResponse = serde_json::from_str(
            r#"{
                "object": "list",
                "data": [
                    {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                    {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
                ],
                "model": "text-embedding-ada-002"
            }"#,
        )
        .unwrap();

        let ordered = order_embeddings(body, 2).unwrap();
        assert_eq!(ordered, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_order_embeddings_count_mismatch() {
        let body = EmbeddingResponse { data: vec![] };
        assert!(matches!(
            order_embeddings(body, 1),
            Err(AppError::Embedding(_))
        ));
    }

    #[test]
    fn test_zero_batch_size_clamped() {
        let settings = EmbeddingSettings {
            batch_size: 0,
            ..EmbeddingSettings::default()
        };
        let provider = OpenAiEmbeddingProvider::new("sk-test", &settings);
        assert_eq!(provider.batch_size, 1);
        assert_eq!(provider.base_url, DEFAULT_OPENAI_URL);
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let provider = OpenAiEmbeddingProvider::new("sk-test", &EmbeddingSettings::default());
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
