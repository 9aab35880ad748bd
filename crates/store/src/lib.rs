//! Pluggable vector store for vecgate.
//!
//! Records of (text, embedding, metadata, timestamp) are stored in an
//! external vector engine behind the [`VectorBackend`] trait. Two engines
//! are supported:
//! - **milvus**: self-hosted, L2 distance over an IVF_FLAT index
//! - **pinecone**: managed, cosine similarity
//!
//! [`VectorService`] ties a backend to an embedding provider so callers can
//! ingest and query plain text.

pub mod backend;
pub mod codec;
pub mod factory;
pub mod milvus;
pub mod pinecone;
pub mod record;
pub mod service;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use backend::VectorBackend;
pub use factory::{create_backend, create_from_settings, BackendKind};
pub use milvus::MilvusBackend;
pub use pinecone::PineconeBackend;
pub use record::{BackendCapabilities, DeleteOutcome, Metadata, Metric, Record, SearchHit};
pub use service::VectorService;
