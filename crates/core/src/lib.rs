//! Vecgate Core Library
//!
//! Foundational utilities shared by every vecgate crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{
    AppConfig, ChatSettings, EmbeddingSettings, MilvusSettings, PineconeSettings,
    VectorStoreSettings,
};
pub use error::{AppError, AppResult};
