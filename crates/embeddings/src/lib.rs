//! Embedding providers for vecgate.
//!
//! Text is turned into vectors by an external provider behind the
//! [`EmbeddingProvider`] trait, so the ingest pipeline never depends on a
//! concrete vendor.
//!
//! # Providers
//! - **openai**: OpenAI-compatible `/embeddings` endpoint (default)
//! - **mock**: deterministic, offline hashing embeddings
//!
//! # Example
//! ```no_run
//! use vecgate_core::EmbeddingSettings;
//! use vecgate_embeddings::create_provider;
//!
//! # async fn example() -> vecgate_core::AppResult<()> {
//! let settings = EmbeddingSettings {
//!     provider: "mock".to_string(),
//!     ..Default::default()
//! };
//! let provider = create_provider(&settings)?;
//! let vector = provider.embed("hello world").await?;
//! assert_eq!(vector.len(), settings.dimensions);
//! # Ok(())
//! # }
//! ```

pub mod factory;
pub mod provider;
pub mod providers;

pub use factory::create_provider;
pub use provider::EmbeddingProvider;
pub use providers::{MockProvider, OpenAiProvider};
