//! Vector backend abstraction.
//!
//! Defines the capability contract every engine adapter implements.

use crate::record::{BackendCapabilities, DeleteOutcome, Metadata, Record, SearchHit};
use async_trait::async_trait;
use vecgate_core::AppResult;

/// Trait for vector store backends.
///
/// Implementations are shared across concurrent requests behind an
/// `Arc<dyn VectorBackend>`, so every method takes `&self`.
///
/// Implementations must:
/// - Reject embeddings whose length differs from [`dimension`](Self::dimension)
///   with `AppError::DimensionMismatch` before touching the engine
/// - Assign the record timestamp themselves
/// - Return search hits best-first for their metric
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Short engine name (e.g., "milvus").
    fn backend_name(&self) -> &str;

    /// Dimension every embedding in the collection must have.
    fn dimension(&self) -> usize;

    /// Metric and optional features of this backend.
    fn capabilities(&self) -> BackendCapabilities;

    /// Establish the session and provision the collection. Idempotent.
    async fn connect(&self) -> AppResult<()>;

    /// Release the session. Never fails after a successful `connect`.
    async fn disconnect(&self) -> AppResult<()>;

    /// Store one record and return it with its id and timestamp.
    async fn insert(
        &self,
        text: &str,
        embedding: &[f32],
        metadata: Option<Metadata>,
    ) -> AppResult<Record>;

    /// Return up to `limit` records closest to `query_embedding`.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> AppResult<Vec<SearchHit>>;

    /// Remove every record with `timestamp < threshold`.
    async fn delete_by_timestamp(&self, threshold: i64) -> AppResult<DeleteOutcome>;
}
