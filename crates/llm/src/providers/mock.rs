//! Mock LLM client for tests and offline runs.
//!
//! Replies are numbered so callers can tell turns apart, and every request
//! is kept for inspection.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use async_trait::async_trait;
use std::sync::Mutex;
use vecgate_core::AppResult;

/// Deterministic chat client.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let turn = match self.requests.lock() {
            Ok(mut requests) => {
                requests.push(request.clone());
                requests.len()
            }
            Err(_) => 0,
        };

        let prompt_tokens = request.prompt.split_whitespace().count() as u32;
        Ok(LlmResponse {
            content: format!("Mock reply {}", turn),
            model: request.model.clone(),
            usage: LlmUsage::new(prompt_tokens, 3),
        })
    }
}
