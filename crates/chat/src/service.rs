//! Chat turn pipeline.
//!
//! A turn runs in four steps:
//! 1. Retrieve the texts most similar to the message
//! 2. Ask the LLM for a reply with that context in the prompt
//! 3. Save the turn to history
//! 4. Embed the message and the reply back into the vector store

use crate::history::ChatHistory;
use crate::prompt::build_prompt;
use crate::types::ChatTurn;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use vecgate_core::{AppError, AppResult, ChatSettings};
use vecgate_llm::{LlmClient, LlmRequest};
use vecgate_store::{Metadata, VectorService};

/// Completion parameters for every turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub context_limit: usize,
}

impl From<&ChatSettings> for ChatOptions {
    fn from(settings: &ChatSettings) -> Self {
        Self {
            model: settings.model.clone(),
            system_prompt: settings.system_prompt.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            context_limit: settings.context_limit,
        }
    }
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self::from(&ChatSettings::default())
    }
}

/// Retrieval-augmented chat over one vector service.
#[derive(Clone)]
pub struct ChatService {
    vectors: VectorService,
    llm: Arc<dyn LlmClient>,
    history: Arc<dyn ChatHistory>,
    options: ChatOptions,
}

impl ChatService {
    pub fn new(
        vectors: VectorService,
        llm: Arc<dyn LlmClient>,
        history: Arc<dyn ChatHistory>,
        options: ChatOptions,
    ) -> Self {
        Self {
            vectors,
            llm,
            history,
            options,
        }
    }

    /// Answer `message` for `user_id` and record the turn.
    ///
    /// # Errors
    /// * `AppError::InvalidInput` - If the user id or message is blank
    /// * Any retrieval, LLM, history or ingest error, unchanged
    #[instrument(skip(self, message), fields(message_len = message.len(), llm = self.llm.provider_name()))]
    pub async fn send(&self, user_id: &str, message: &str) -> AppResult<ChatTurn> {
        if user_id.trim().is_empty() {
            return Err(AppError::InvalidInput("userId must not be empty".to_string()));
        }
        if message.trim().is_empty() {
            return Err(AppError::InvalidInput("message must not be empty".to_string()));
        }

        let context: Vec<String> = self
            .vectors
            .embed_and_search(message, self.options.context_limit)
            .await?
            .into_iter()
            .map(|hit| hit.text)
            .collect();
        debug!("Retrieved {} context entries", context.len());

        let request = LlmRequest::new(build_prompt(&context, message), &self.options.model)
            .with_system(&self.options.system_prompt)
            .with_temperature(self.options.temperature)
            .with_max_tokens(self.options.max_tokens);
        let reply = self.llm.complete(&request).await?;

        let turn = ChatTurn::new(user_id, message, reply.content, context);
        self.history.append(&turn).await?;

        let (stored_message, stored_reply) = tokio::join!(
            self.vectors
                .embed_and_store(&turn.message, Some(turn_metadata(user_id, turn.created_at, false))),
            self.vectors
                .embed_and_store(&turn.response, Some(turn_metadata(user_id, turn.created_at, true))),
        );
        stored_message?;
        stored_reply?;

        info!(
            "Chat turn {} answered with {} context entries ({} tokens)",
            turn.id,
            turn.context.len(),
            reply.usage.total_tokens
        );
        Ok(turn)
    }

    /// Past turns of `user_id`, newest first.
    pub async fn history(&self, user_id: &str) -> AppResult<Vec<ChatTurn>> {
        self.history.for_user(user_id).await
    }
}

/// Metadata stored with each side of a turn.
fn turn_metadata(user_id: &str, at: DateTime<Utc>, is_response: bool) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("userId".to_string(), json!(user_id));
    metadata.insert(
        "timestamp".to_string(),
        Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    if is_response {
        metadata.insert("isResponse".to_string(), json!(true));
    }
    metadata
}
