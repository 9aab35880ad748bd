//! Command handlers for the vecgate CLI.
//!
//! Every command builds the same [`VectorService`] from configuration: an
//! embedding provider plus one connected backend. Chat commands and the
//! server add a [`ChatService`] on top of it.

pub mod chat;
pub mod cleanup;
pub mod embed;
pub mod history;
pub mod search;
pub mod serve;

// Re-export command types for convenience
pub use chat::ChatCommand;
pub use cleanup::CleanupCommand;
pub use embed::EmbedCommand;
pub use history::HistoryCommand;
pub use search::SearchCommand;
pub use serve::ServeCommand;

use std::sync::Arc;
use vecgate_chat::{ChatOptions, ChatService, SqliteHistory};
use vecgate_core::{AppConfig, AppResult};
use vecgate_embeddings::create_provider;
use vecgate_llm::create_client;
use vecgate_store::{create_from_settings, VectorService};

/// Build the provider and connect the configured backend.
pub async fn build_service(config: &AppConfig) -> AppResult<VectorService> {
    let embedder = create_provider(&config.embedding)?;
    tracing::debug!(
        "Embedding provider: {} ({}, dim={})",
        embedder.provider_name(),
        embedder.model_name(),
        embedder.dimensions()
    );

    let backend = create_from_settings(&config.vector).await?;
    tracing::info!(
        "Using {} backend, collection '{}'",
        backend.backend_name(),
        config.vector.collection
    );

    Ok(VectorService::new(embedder, backend))
}

/// Build the chat pipeline over an existing vector service.
pub fn build_chat(config: &AppConfig, service: VectorService) -> AppResult<ChatService> {
    let llm = create_client(&config.chat)?;
    let history = SqliteHistory::open(&config.chat.history_path)?;
    tracing::debug!(
        "Chat: {} / {}, history at {:?}",
        llm.provider_name(),
        config.chat.model,
        config.chat.history_path
    );

    Ok(ChatService::new(
        service,
        llm,
        Arc::new(history),
        ChatOptions::from(&config.chat),
    ))
}
