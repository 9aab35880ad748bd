//! Embedding provider factory.
//!
//! Resolves the configured provider name to a concrete implementation and
//! checks that the secrets it needs are present.

use crate::provider::EmbeddingProvider;
use crate::providers::{MockProvider, OpenAiProvider};
use std::sync::Arc;
use vecgate_core::{AppError, AppResult, EmbeddingSettings};

/// Create an embedding provider from settings.
///
/// # Errors
/// Returns `AppError::Config` if:
/// - The provider is unknown
/// - The OpenAI provider is selected without an API key
/// - The HTTP client cannot be built
pub fn create_provider(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.to_lowercase().as_str() {
        "openai" => {
            let api_key = settings.api_key.as_deref().ok_or_else(|| {
                AppError::Config("OpenAI provider requires OPENAI_API_KEY to be set".to_string())
            })?;
            let provider = OpenAiProvider::new(
                &settings.base_url,
                api_key,
                &settings.model,
                settings.dimensions,
                settings.timeout_secs,
            )?;
            Ok(Arc::new(provider))
        }
        "mock" => Ok(Arc::new(MockProvider::new(settings.dimensions))),
        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: openai, mock",
            other
        ))),
    }
}
