//! Answerer stand-in for front end tests.

use async_trait::async_trait;
use docqa_core::{AppError, AppResult};
use docqa_knowledge::{QuestionAnswerer, RagAnswer};
use std::sync::Mutex;

/// Echoes questions back, or fails when built with [`StubAnswerer::failing`].
#[derive(Default)]
pub struct StubAnswerer {
    fail: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl StubAnswerer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Questions and instructions received so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuestionAnswerer for StubAnswerer {
    async fn answer(&self, question: &str, instruction: &str) -> AppResult<RagAnswer> {
        self.calls
            .lock()
            .unwrap()
            .push((question.to_string(), instruction.to_string()));

        if self.fail {
            return Err(AppError::Llm("chat service unavailable".to_string()));
        }

        Ok(RagAnswer {
            context: String::new(),
            answer: format!("echo: {}", question),
            chunks: Vec::new(),
        })
    }
}
