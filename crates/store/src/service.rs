//! Ingest/query pipeline.
//!
//! Embeds text with the configured provider and hands the vector to the
//! active backend. Errors from either side propagate unchanged.

use crate::backend::VectorBackend;
use crate::record::{DeleteOutcome, Metadata, Record, SearchHit};
use std::sync::Arc;
use tracing::instrument;
use vecgate_core::AppResult;
use vecgate_embeddings::EmbeddingProvider;

/// Text-in, vectors-out facade over one provider and one backend.
#[derive(Clone)]
pub struct VectorService {
    embedder: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn VectorBackend>,
}

impl VectorService {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, backend: Arc<dyn VectorBackend>) -> Self {
        Self { embedder, backend }
    }

    pub fn backend(&self) -> &Arc<dyn VectorBackend> {
        &self.backend
    }

    /// Embed `text` and store it with `metadata`.
    #[instrument(skip(self, text, metadata), fields(text_len = text.len(), backend = self.backend.backend_name()))]
    pub async fn embed_and_store(&self, text: &str, metadata: Option<Metadata>) -> AppResult<Record> {
        let embedding = self.embedder.embed(text).await?;
        self.backend.insert(text, &embedding, metadata).await
    }

    /// Embed `query` and return up to `limit` nearest records.
    #[instrument(skip(self, query), fields(query_len = query.len(), backend = self.backend.backend_name()))]
    pub async fn embed_and_search(&self, query: &str, limit: usize) -> AppResult<Vec<SearchHit>> {
        let embedding = self.embedder.embed(query).await?;
        self.backend.search(&embedding, limit).await
    }

    /// Delete every record stored before `timestamp`.
    pub async fn purge_before(&self, timestamp: i64) -> AppResult<DeleteOutcome> {
        self.backend.delete_by_timestamp(timestamp).await
    }

    /// Release the backend session.
    pub async fn shutdown(&self) -> AppResult<()> {
        self.backend.disconnect().await
    }
}
