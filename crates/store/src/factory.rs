//! Backend factory.
//!
//! Maps a configuration string to exactly one adapter and connects it
//! before handing it out.

use crate::backend::VectorBackend;
use crate::milvus::MilvusBackend;
use crate::pinecone::PineconeBackend;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use vecgate_core::{AppError, AppResult, VectorStoreSettings};

/// Supported vector engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Milvus,
    Pinecone,
}

impl FromStr for BackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "milvus" => Ok(BackendKind::Milvus),
            "pinecone" => Ok(BackendKind::Pinecone),
            _ => Err(AppError::UnsupportedBackend(s.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Milvus => write!(f, "milvus"),
            BackendKind::Pinecone => write!(f, "pinecone"),
        }
    }
}

/// Construct and connect the backend selected by `kind`.
///
/// The selector is parsed before anything is built, so an unknown value
/// fails with `AppError::UnsupportedBackend` and constructs nothing.
/// Construction is eager: the returned backend has already provisioned its
/// collection or index.
pub async fn create_backend(
    kind: &str,
    collection: &str,
    dimension: usize,
    settings: &VectorStoreSettings,
) -> AppResult<Arc<dyn VectorBackend>> {
    let kind: BackendKind = kind.parse()?;

    let backend: Arc<dyn VectorBackend> = match kind {
        BackendKind::Milvus => Arc::new(MilvusBackend::new(settings, collection, dimension)?),
        BackendKind::Pinecone => Arc::new(PineconeBackend::new(settings, collection, dimension)?),
    };

    tracing::debug!(
        "Connecting {} backend for collection '{}' (dim={})",
        kind,
        collection,
        dimension
    );
    backend.connect().await?;

    Ok(backend)
}

/// [`create_backend`] using the selector, collection and dimension from settings.
pub async fn create_from_settings(
    settings: &VectorStoreSettings,
) -> AppResult<Arc<dyn VectorBackend>> {
    create_backend(
        &settings.backend,
        &settings.collection,
        settings.dimension,
        settings,
    )
    .await
}
