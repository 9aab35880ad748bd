//! Pinecone-backed vector store.
//!
//! The control plane (`/indexes`) provisions and describes the index; the
//! data plane lives on the per-index host returned by describe. Pinecone
//! cannot delete by metadata range on every index type, and no
//! timestamp-to-id index is kept here, so `delete_by_timestamp` is a
//! documented no-op.
//!
//! Pinecone keeps a single flat metadata map per vector. The record text and
//! timestamp live there under reserved `_vecgate_*` keys so that caller keys
//! such as `text` or `timestamp` are stored and returned untouched.

use crate::backend::VectorBackend;
use crate::codec::{check_dimension, now_timestamp};
use crate::record::{BackendCapabilities, DeleteOutcome, Metadata, Metric, Record, SearchHit};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use vecgate_core::{AppError, AppResult, VectorStoreSettings};

const API_VERSION: &str = "2024-07";
const DEFAULT_POD_TYPE: &str = "p1.x1";
const TEXT_KEY: &str = "_vecgate_text";
const TIMESTAMP_KEY: &str = "_vecgate_timestamp";

/// Pinecone vector store for one index.
pub struct PineconeBackend {
    client: Client,
    controller_url: String,
    api_key: String,
    environment: String,
    index_name: String,
    dimension: usize,
    /// Data-plane base URL, known once connected
    host: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexSummary>,
}

#[derive(Debug, Deserialize)]
struct IndexSummary {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    dimension: usize,
    host: String,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Match {
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

impl PineconeBackend {
    /// Create an unconnected backend.
    ///
    /// # Errors
    /// * `AppError::Config` - If the API key or environment is missing
    pub fn new(settings: &VectorStoreSettings, index_name: &str, dimension: usize) -> AppResult<Self> {
        let pinecone = &settings.pinecone;
        let api_key = required(&pinecone.api_key, "PINECONE_API_KEY")?;
        let environment = required(&pinecone.environment, "PINECONE_ENVIRONMENT")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let normalized = normalize_index_name(index_name);
        if normalized != index_name {
            debug!("Using Pinecone index name '{}' for '{}'", normalized, index_name);
        }

        Ok(Self {
            client,
            controller_url: pinecone.controller_url.trim_end_matches('/').to_string(),
            api_key,
            environment,
            index_name: normalized,
            dimension,
            host: RwLock::new(None),
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> AppResult<T> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                AppError::Connection(format!("Pinecone unreachable ({}): {}", what, e))
            } else {
                AppError::Backend(format!("Pinecone {} failed: {}", what, e))
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::Connection(format!(
                "Pinecone rejected credentials ({})",
                status
            )));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Backend(format!(
                "Pinecone API error ({}) during {}: {}",
                status, what, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("Failed to parse Pinecone {} response: {}", what, e)))
    }

    async fn data_plane(&self) -> AppResult<String> {
        self.host.read().await.clone().ok_or_else(|| {
            AppError::Connection(format!(
                "Pinecone index '{}' is not connected",
                self.index_name
            ))
        })
    }

    async fn create_index(&self) -> AppResult<()> {
        let body = json!({
            "name": self.index_name,
            "dimension": self.dimension,
            "metric": "cosine",
            "spec": {
                "pod": {
                    "environment": self.environment,
                    "pod_type": DEFAULT_POD_TYPE
                }
            }
        });

        let url = format!("{}/indexes", self.controller_url);
        self.send::<Value>(self.request(Method::POST, &url).json(&body), "create index")
            .await?;

        info!(
            "Created Pinecone index '{}' (dim={}, cosine, {})",
            self.index_name, self.dimension, self.environment
        );
        Ok(())
    }
}

fn required(value: &Option<String>, key: &str) -> AppResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(AppError::Config(format!("{} must be set for the pinecone backend", key))),
    }
}

/// Lowercase and replace characters Pinecone rejects in index names.
pub fn normalize_index_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Convert caller metadata into values Pinecone accepts.
///
/// Strings, numbers, booleans and lists of strings pass through; anything
/// else is stored as its JSON text. Keys that collide with the reserved
/// record fields are rejected.
fn to_pinecone_metadata(metadata: &Metadata) -> AppResult<Metadata> {
    if let Some(key) = [TEXT_KEY, TIMESTAMP_KEY]
        .into_iter()
        .find(|k| metadata.contains_key(*k))
    {
        return Err(AppError::Backend(format!(
            "Metadata key '{}' is reserved by the pinecone backend",
            key
        )));
    }

    Ok(metadata
        .iter()
        .map(|(key, value)| {
            let coerced = match value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => value.clone(),
                Value::Array(items) if items.iter().all(Value::is_string) => value.clone(),
                other => Value::String(other.to_string()),
            };
            (key.clone(), coerced)
        })
        .collect())
}

/// Split a match's metadata into (text, timestamp, caller metadata).
fn split_metadata(mut metadata: Metadata) -> (String, i64, Metadata) {
    let text = match metadata.remove(TEXT_KEY) {
        Some(Value::String(s)) => s,
        _ => String::new(),
    };
    // Pinecone hands numbers back as floats
    let timestamp = metadata
        .remove(TIMESTAMP_KEY)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .unwrap_or(0);
    (text, timestamp, metadata)
}

fn with_scheme(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

#[async_trait]
impl VectorBackend for PineconeBackend {
    fn backend_name(&self) -> &str {
        "pinecone"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            metric: Metric::Cosine,
            delete_by_timestamp: false,
        }
    }

    #[instrument(skip(self), fields(index = %self.index_name))]
    async fn connect(&self) -> AppResult<()> {
        let mut host = self.host.write().await;
        if host.is_some() {
            return Ok(());
        }

        let list_url = format!("{}/indexes", self.controller_url);
        let list: IndexList = self
            .send(self.request(Method::GET, &list_url), "list indexes")
            .await?;

        if !list.indexes.iter().any(|i| i.name == self.index_name) {
            self.create_index().await?;
        }

        let describe_url = format!("{}/indexes/{}", self.controller_url, self.index_name);
        let description: IndexDescription = self
            .send(self.request(Method::GET, &describe_url), "describe index")
            .await?;

        check_dimension(self.dimension, description.dimension)?;

        if !description.status.as_ref().is_some_and(|s| s.ready) {
            warn!("Pinecone index '{}' is not ready yet", self.index_name);
        }

        let data_plane = with_scheme(&description.host);
        info!("Connected to Pinecone index '{}' at {}", self.index_name, data_plane);
        *host = Some(data_plane);
        Ok(())
    }

    async fn disconnect(&self) -> AppResult<()> {
        // Every call is a stateless HTTPS request; nothing to release
        debug!("Pinecone disconnect is a no-op");
        Ok(())
    }

    #[instrument(skip(self, text, embedding, metadata), fields(index = %self.index_name, text_len = text.len()))]
    async fn insert(
        &self,
        text: &str,
        embedding: &[f32],
        metadata: Option<Metadata>,
    ) -> AppResult<Record> {
        check_dimension(self.dimension, embedding.len())?;
        let host = self.data_plane().await?;

        let id = Uuid::new_v4().to_string();
        let timestamp = now_timestamp();
        let caller_metadata = to_pinecone_metadata(&metadata.unwrap_or_default())?;

        let mut payload = caller_metadata.clone();
        payload.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        payload.insert(TIMESTAMP_KEY.to_string(), json!(timestamp));

        let body = json!({
            "vectors": [{
                "id": id,
                "values": embedding,
                "metadata": payload
            }]
        });

        let url = format!("{}/vectors/upsert", host);
        self.send::<Value>(self.request(Method::POST, &url).json(&body), "upsert")
            .await?;
        debug!("Upserted vector {} at {}", id, timestamp);

        Ok(Record {
            id: Some(id),
            text: text.to_string(),
            embedding: embedding.to_vec(),
            metadata: caller_metadata,
            timestamp,
        })
    }

    #[instrument(skip(self, query_embedding), fields(index = %self.index_name))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> AppResult<Vec<SearchHit>> {
        check_dimension(self.dimension, query_embedding.len())?;
        let host = self.data_plane().await?;

        if limit == 0 {
            return Ok(Vec::new());
        }

        let body = json!({
            "vector": query_embedding,
            "topK": limit,
            "includeMetadata": true,
            "includeValues": false
        });

        let url = format!("{}/query", host);
        let response: QueryResponse = self
            .send(self.request(Method::POST, &url).json(&body), "query")
            .await?;

        let mut results: Vec<SearchHit> = response
            .matches
            .into_iter()
            .take(limit)
            .map(|m| {
                let (text, timestamp, metadata) = split_metadata(m.metadata.unwrap_or_default());
                SearchHit {
                    text,
                    metadata,
                    timestamp,
                    distance: m.score,
                }
            })
            .collect();

        Metric::Cosine.sort_hits(&mut results);
        debug!("Pinecone returned {} matches", results.len());

        Ok(results)
    }

    async fn delete_by_timestamp(&self, threshold: i64) -> AppResult<DeleteOutcome> {
        warn!(
            "Pinecone cannot delete by timestamp; records older than {} were kept",
            threshold
        );
        Ok(DeleteOutcome::Unsupported)
    }
}
