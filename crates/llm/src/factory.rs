//! LLM client factory.
//!
//! Resolves the configured provider name to a concrete client and checks
//! that the secrets it needs are present.

use crate::client::LlmClient;
use crate::providers::{MockLlmClient, OpenAiChatClient};
use std::sync::Arc;
use vecgate_core::{AppError, AppResult, ChatSettings};

/// Create a chat-completion client from settings.
///
/// # Errors
/// Returns `AppError::Config` if:
/// - The provider is unknown
/// - The OpenAI provider is selected without an API key
pub fn create_client(settings: &ChatSettings) -> AppResult<Arc<dyn LlmClient>> {
    match settings.provider.to_lowercase().as_str() {
        "openai" => {
            let api_key = settings
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    AppError::Config(
                        "OpenAI chat provider requires OPENAI_API_KEY to be set".to_string(),
                    )
                })?;
            let client =
                OpenAiChatClient::new(&settings.base_url, api_key, settings.timeout_secs)?;
            Ok(Arc::new(client))
        }
        "mock" => Ok(Arc::new(MockLlmClient::new())),
        other => Err(AppError::Config(format!(
            "Unknown chat provider: '{}'. Supported providers: openai, mock",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_client() {
        let settings = ChatSettings {
            provider: "Mock".to_string(),
            ..Default::default()
        };
        assert_eq!(create_client(&settings).unwrap().provider_name(), "mock");
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client(&ChatSettings::default()) {
            Err(AppError::Config(msg)) => assert!(msg.contains("OPENAI_API_KEY")),
            Err(other) => panic!("expected config error, got {:?}", other),
            Ok(_) => panic!("expected config error"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        let settings = ChatSettings {
            provider: "claude".to_string(),
            ..Default::default()
        };
        match create_client(&settings) {
            Err(err) => assert!(err.to_string().contains("Unknown chat provider: 'claude'")),
            Ok(_) => panic!("expected error for unknown provider"),
        }
    }
}
