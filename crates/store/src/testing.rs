//! In-memory backend for tests.
//!
//! Exact (brute-force) search with the same contract as the real adapters.
//! Enabled for this crate's tests and for downstream crates through the
//! `testing` feature.

use crate::backend::VectorBackend;
use crate::codec::{check_dimension, now_timestamp};
use crate::record::{BackendCapabilities, DeleteOutcome, Metadata, Metric, Record, SearchHit};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use vecgate_core::{AppError, AppResult};

pub struct InMemoryBackend {
    dimension: usize,
    metric: Metric,
    connected: RwLock<bool>,
    records: RwLock<Vec<Record>>,
    next_id: AtomicU64,
}

impl InMemoryBackend {
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            connected: RwLock::new(false),
            records: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Insert a record with a fixed timestamp, bypassing the clock.
    pub async fn insert_at(&self, text: &str, embedding: &[f32], timestamp: i64) -> AppResult<()> {
        check_dimension(self.dimension, embedding.len())?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.records.write().await.push(Record {
            id: Some(id.to_string()),
            text: text.to_string(),
            embedding: embedding.to_vec(),
            metadata: Metadata::new(),
            timestamp,
        });
        Ok(())
    }

    async fn require_connected(&self) -> AppResult<()> {
        if *self.connected.read().await {
            Ok(())
        } else {
            Err(AppError::Connection("in-memory backend is not connected".to_string()))
        }
    }

    fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            Metric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            Metric::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    0.0
                } else {
                    dot / (norm_a * norm_b)
                }
            }
        }
    }
}

#[async_trait]
impl VectorBackend for InMemoryBackend {
    fn backend_name(&self) -> &str {
        "memory"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            metric: self.metric,
            delete_by_timestamp: true,
        }
    }

    async fn connect(&self) -> AppResult<()> {
        *self.connected.write().await = true;
        Ok(())
    }

    async fn disconnect(&self) -> AppResult<()> {
        *self.connected.write().await = false;
        Ok(())
    }

    async fn insert(
        &self,
        text: &str,
        embedding: &[f32],
        metadata: Option<Metadata>,
    ) -> AppResult<Record> {
        check_dimension(self.dimension, embedding.len())?;
        self.require_connected().await?;

        let record = Record {
            id: Some(self.next_id.fetch_add(1, Ordering::Relaxed).to_string()),
            text: text.to_string(),
            embedding: embedding.to_vec(),
            metadata: metadata.unwrap_or_default(),
            timestamp: now_timestamp(),
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> AppResult<Vec<SearchHit>> {
        check_dimension(self.dimension, query_embedding.len())?;
        self.require_connected().await?;

        let records = self.records.read().await;
        let mut hits: Vec<SearchHit> = records
            .iter()
            .map(|r| SearchHit {
                text: r.text.clone(),
                metadata: r.metadata.clone(),
                timestamp: r.timestamp,
                distance: self.score(query_embedding, &r.embedding),
            })
            .collect();

        self.metric.sort_hits(&mut hits);
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete_by_timestamp(&self, threshold: i64) -> AppResult<DeleteOutcome> {
        self.require_connected().await?;

        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.timestamp >= threshold);
        Ok(DeleteOutcome::Completed {
            deleted: Some((before - records.len()) as u64),
        })
    }
}
