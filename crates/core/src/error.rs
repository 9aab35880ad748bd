//! Error types for vecgate.
//!
//! A single error enum covers configuration, connectivity, embedding,
//! vector-store and chat failures so that every layer can propagate with `?`.

use thiserror::Error;

/// Unified error type for vecgate.
///
/// All fallible functions return `Result<T, AppError>`. The HTTP layer
/// renders any variant through its `Display` impl; only `InvalidInput` is
/// reported as a client error.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid configuration (credentials, selectors, numbers)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The vector engine could not be reached or rejected the session
    #[error("Connection error: {0}")]
    Connection(String),

    /// An embedding does not match the collection's dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The upstream embedding call failed or returned no vectors
    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(String),

    /// Unknown vector backend selector
    #[error("Unsupported vector database type: {0}")]
    UnsupportedBackend(String),

    /// Engine-specific failure passed through from the backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// The chat-completion call failed or returned nothing
    #[error("LLM provider error: {0}")]
    Llm(String),

    /// Chat history could not be read or written
    #[error("Chat history error: {0}")]
    History(String),

    /// The request itself is unusable (empty message, blank user id)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
