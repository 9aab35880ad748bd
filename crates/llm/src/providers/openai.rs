//! OpenAI chat-completion client.
//!
//! Calls an OpenAI-compatible `POST /chat/completions` endpoint
//! (https://platform.openai.com/docs/api-reference/chat).

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use vecgate_core::{AppError, AppResult};

const COMPLETIONS_ENDPOINT: &str = "/chat/completions";

/// OpenAI chat-completion client.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<LlmUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAiChatClient {
    /// Create a new client.
    ///
    /// # Errors
    /// * `AppError::Config` - If the HTTP client cannot be built
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model, prompt_len = request.prompt.len()))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let url = format!("{}{}", self.base_url, COMPLETIONS_ENDPOINT);
        debug!("Sending completion request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &request.model,
                messages,
                temperature: request.temperature,
                max_tokens: request.max_tokens,
            })
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);

            return Err(AppError::Llm(format!(
                "OpenAI API error ({}): {}",
                status, message
            )));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::Llm("OpenAI returned no completion".to_string()))?;

        let usage = body.usage.unwrap_or_default();
        debug!(
            "Completion received ({} prompt / {} completion tokens)",
            usage.prompt_tokens, usage.completion_tokens
        );

        Ok(LlmResponse {
            content,
            model: body.model.unwrap_or_else(|| request.model.clone()),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_complete_sends_system_and_user_messages() {
        let router = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "gpt-4");
                assert_eq!(body["max_tokens"], 500);
                assert_eq!(body["messages"][0], json!({"role": "system", "content": "be kind"}));
                assert_eq!(body["messages"][1], json!({"role": "user", "content": "User: hi\nAssistant:"}));
                Json(json!({
                    "model": "gpt-4-0613",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello!"}}],
                    "usage": {"prompt_tokens": 20, "completion_tokens": 3, "total_tokens": 23}
                }))
            }),
        );
        let base_url = serve(router).await;

        let client = OpenAiChatClient::new(&base_url, "sk-test", 5).unwrap();
        let request = LlmRequest::new("User: hi\nAssistant:", "gpt-4")
            .with_system("be kind")
            .with_max_tokens(500);
        let response = client.complete(&request).await.unwrap();

        assert_eq!(response.content, "Hello!");
        assert_eq!(response.model, "gpt-4-0613");
        assert_eq!(response.usage.total_tokens, 23);
    }

    #[tokio::test]
    async fn test_api_error_surfaces_message() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({"error": {"message": "Rate limit reached"}})),
                )
            }),
        );
        let base_url = serve(router).await;

        let client = OpenAiChatClient::new(&base_url, "sk", 5).unwrap();
        match client.complete(&LlmRequest::new("hi", "gpt-4")).await {
            Err(AppError::Llm(msg)) => assert!(msg.contains("Rate limit reached")),
            other => panic!("expected LLM error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_null_content_is_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({"choices": [{"message": {"content": null}}]})) }),
        );
        let base_url = serve(router).await;

        let client = OpenAiChatClient::new(&base_url, "sk", 5).unwrap();
        let result = client.complete(&LlmRequest::new("hi", "gpt-4")).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }
}
