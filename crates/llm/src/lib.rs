//! Chat-completion clients for vecgate.
//!
//! Replies are generated by an external LLM behind the [`LlmClient`] trait,
//! so the chat pipeline never depends on a concrete vendor.
//!
//! # Providers
//! - **openai**: OpenAI-compatible `/chat/completions` endpoint (default)
//! - **mock**: deterministic offline replies
//!
//! # Example
//! ```no_run
//! use vecgate_core::ChatSettings;
//! use vecgate_llm::{create_client, LlmRequest};
//!
//! # async fn example() -> vecgate_core::AppResult<()> {
//! let settings = ChatSettings {
//!     provider: "mock".to_string(),
//!     ..Default::default()
//! };
//! let client = create_client(&settings)?;
//! let response = client.complete(&LlmRequest::new("Hello", "gpt-4")).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockLlmClient, OpenAiChatClient};
