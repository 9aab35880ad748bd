//! Record model shared by every backend.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Caller-supplied metadata attached to a record.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One stored item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Backend-assigned identifier, opaque to callers
    pub id: Option<String>,

    /// Source text
    pub text: String,

    /// Embedding vector (length equals the collection dimension)
    pub embedding: Vec<f32>,

    /// Metadata; empty when none was supplied
    #[serde(default)]
    pub metadata: Metadata,

    /// Seconds since epoch, assigned at insert time
    pub timestamp: i64,
}

/// A single search match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub metadata: Metadata,
    pub timestamp: i64,

    /// Distance (L2, lower is closer) or similarity (cosine, higher is closer)
    /// depending on the backend metric
    pub distance: f32,
}

/// Ranking function used by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Euclidean distance; results ascend
    L2,
    /// Cosine similarity; results descend
    Cosine,
}

impl Metric {
    /// Order hits best-first for this metric.
    pub fn sort_hits(self, hits: &mut [SearchHit]) {
        hits.sort_by(|a, b| {
            let ord = a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal);
            match self {
                Metric::L2 => ord,
                Metric::Cosine => ord.reverse(),
            }
        });
    }
}

/// What a backend can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackendCapabilities {
    pub metric: Metric,

    /// Whether `delete_by_timestamp` actually deletes
    pub delete_by_timestamp: bool,
}

/// Result of a `delete_by_timestamp` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The engine executed the delete; the count is reported when known
    Completed { deleted: Option<u64> },

    /// The engine cannot delete by predicate; nothing was removed
    Unsupported,
}
