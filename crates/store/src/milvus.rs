//! Milvus-backed vector store.
//!
//! Talks to a self-hosted Milvus over its v2 RESTful API
//! (`/v2/vectordb/...`, served on the same port as gRPC). Every response is
//! wrapped in `{code, message, data}`; a non-zero `code` is an engine error.
//!
//! `collections/load` only starts loading a collection into memory. Search
//! polls `collections/get_load_state` until the engine reports it loaded,
//! then remembers that until the next failed search or disconnect.

use crate::backend::VectorBackend;
use crate::codec::{check_dimension, decode_metadata, encode_metadata, now_timestamp};
use crate::record::{BackendCapabilities, DeleteOutcome, Metadata, Metric, Record, SearchHit};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use vecgate_core::{AppError, AppResult, VectorStoreSettings};

const API_PREFIX: &str = "/v2/vectordb";
const VARCHAR_MAX_LENGTH: u32 = 65535;
const OUTPUT_FIELDS: [&str; 3] = ["text", "metadata", "timestamp"];
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);
const LOAD_STATE_LOADED: &str = "LoadStateLoaded";

/// Milvus vector store for one collection.
pub struct MilvusBackend {
    client: Client,
    endpoint: String,
    token: Option<String>,
    collection: String,
    dimension: usize,
    nlist: u32,
    nprobe: u32,
    flush_on_insert: bool,
    load_timeout: Duration,
    connected: RwLock<bool>,
    loaded: Mutex<bool>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct HasCollection {
    has: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertResult {
    #[serde(default)]
    insert_ids: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadState {
    load_state: String,
    #[serde(default)]
    load_progress: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    distance: f32,
    #[serde(default)]
    text: String,
    #[serde(default)]
    metadata: String,
    #[serde(default)]
    timestamp: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResult {
    delete_count: Option<u64>,
}

impl MilvusBackend {
    /// Create an unconnected backend for `collection`.
    ///
    /// # Errors
    /// * `AppError::Config` - If the HTTP client cannot be built
    pub fn new(settings: &VectorStoreSettings, collection: &str, dimension: usize) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: settings.milvus.endpoint(),
            token: settings.milvus.token.clone(),
            collection: collection.to_string(),
            dimension,
            nlist: settings.milvus.nlist,
            nprobe: settings.milvus.nprobe,
            flush_on_insert: settings.flush_on_insert,
            load_timeout: Duration::from_secs(settings.timeout_secs),
            connected: RwLock::new(false),
            loaded: Mutex::new(false),
        })
    }

    /// POST `body` to `path` and decode the `data` field of the envelope.
    async fn call<T: DeserializeOwned>(&self, path: &str, body: Value) -> AppResult<T> {
        let url = format!("{}{}/{}", self.endpoint, API_PREFIX, path);
        debug!("Milvus request: POST {}", url);

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                AppError::Connection(format!("Milvus unreachable at {}: {}", self.endpoint, e))
            } else {
                AppError::Backend(format!("Milvus request to {} failed: {}", path, e))
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::Connection(format!(
                "Milvus rejected credentials ({})",
                status
            )));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Backend(format!(
                "Milvus API error ({}) on {}: {}",
                status, path, error_text
            )));
        }

        let envelope: Envelope = response.json().await.map_err(|e| {
            AppError::Backend(format!("Failed to parse Milvus response from {}: {}", path, e))
        })?;

        if envelope.code != 0 {
            return Err(AppError::Backend(format!(
                "Milvus error {} on {}: {}",
                envelope.code, path, envelope.message
            )));
        }

        // Some endpoints answer with no data at all
        let data = if envelope.data.is_null() {
            json!({})
        } else {
            envelope.data
        };

        serde_json::from_value(data).map_err(|e| {
            AppError::Backend(format!("Unexpected Milvus payload from {}: {}", path, e))
        })
    }

    async fn require_connected(&self) -> AppResult<()> {
        if *self.connected.read().await {
            Ok(())
        } else {
            Err(AppError::Connection(format!(
                "Milvus collection '{}' is not connected",
                self.collection
            )))
        }
    }

    async fn create_collection(&self) -> AppResult<()> {
        let body = json!({
            "collectionName": self.collection,
            "description": "Text embeddings",
            "schema": {
                "autoId": true,
                "enableDynamicField": false,
                "fields": [
                    {"fieldName": "id", "dataType": "Int64", "isPrimary": true},
                    {
                        "fieldName": "embedding",
                        "dataType": "FloatVector",
                        "elementTypeParams": {"dim": self.dimension}
                    },
                    {
                        "fieldName": "text",
                        "dataType": "VarChar",
                        "elementTypeParams": {"max_length": VARCHAR_MAX_LENGTH}
                    },
                    {
                        "fieldName": "metadata",
                        "dataType": "VarChar",
                        "elementTypeParams": {"max_length": VARCHAR_MAX_LENGTH}
                    },
                    {"fieldName": "timestamp", "dataType": "Int64"}
                ]
            },
            "indexParams": [{
                "fieldName": "embedding",
                "indexName": "embedding_ivf_flat",
                "metricType": "L2",
                "params": {"index_type": "IVF_FLAT", "nlist": self.nlist}
            }]
        });

        self.call::<Value>("collections/create", body).await?;
        info!(
            "Created Milvus collection '{}' (dim={}, IVF_FLAT nlist={})",
            self.collection, self.dimension, self.nlist
        );
        Ok(())
    }

    /// Load the collection and wait until the engine can search it.
    async fn ensure_loaded(&self) -> AppResult<()> {
        let mut loaded = self.loaded.lock().await;
        if *loaded {
            return Ok(());
        }

        let collection = json!({"collectionName": self.collection});
        self.call::<Value>("collections/load", collection.clone()).await?;

        let deadline = Instant::now() + self.load_timeout;
        loop {
            let state: LoadState = self
                .call("collections/get_load_state", collection.clone())
                .await?;
            if state.load_state == LOAD_STATE_LOADED {
                break;
            }
            if Instant::now() >= deadline {
                return Err(AppError::Backend(format!(
                    "Milvus collection '{}' did not finish loading within {}s ({})",
                    self.collection,
                    self.load_timeout.as_secs(),
                    state.load_state
                )));
            }
            debug!(
                "Waiting for Milvus collection '{}' to load ({}, {}%)",
                self.collection,
                state.load_state,
                state.load_progress.unwrap_or(0)
            );
            tokio::time::sleep(LOAD_POLL_INTERVAL).await;
        }

        *loaded = true;
        debug!("Milvus collection '{}' is loaded", self.collection);
        Ok(())
    }

    /// Check that an existing collection stores vectors of our dimension.
    async fn validate_existing(&self) -> AppResult<()> {
        let description: Value = self
            .call("collections/describe", json!({"collectionName": self.collection}))
            .await?;

        let recorded = recorded_dimension(&description).ok_or_else(|| {
            AppError::Backend(format!(
                "Milvus collection '{}' has no float vector field",
                self.collection
            ))
        })?;

        check_dimension(self.dimension, recorded)?;
        debug!(
            "Reusing Milvus collection '{}' (dim={})",
            self.collection, recorded
        );
        Ok(())
    }
}

/// Extract the `dim` param of the first float vector field in a describe
/// response. Milvus reports it either as a number or a numeric string.
fn recorded_dimension(description: &Value) -> Option<usize> {
    let fields = description.get("fields")?.as_array()?;
    let vector_field = fields.iter().find(|f| {
        f.get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| t.eq_ignore_ascii_case("FloatVector"))
    })?;

    vector_field
        .get("params")?
        .as_array()?
        .iter()
        .find(|p| p.get("key").and_then(Value::as_str) == Some("dim"))
        .and_then(|p| p.get("value"))
        .and_then(|v| match v {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_u64().map(|n| n as usize),
            _ => None,
        })
}

fn render_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl VectorBackend for MilvusBackend {
    fn backend_name(&self) -> &str {
        "milvus"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            metric: Metric::L2,
            delete_by_timestamp: true,
        }
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn connect(&self) -> AppResult<()> {
        let mut connected = self.connected.write().await;
        if *connected {
            return Ok(());
        }

        let exists: HasCollection = self
            .call("collections/has", json!({"collectionName": self.collection}))
            .await?;

        if exists.has {
            self.validate_existing().await?;
        } else {
            self.create_collection().await?;
        }

        *connected = true;
        info!("Connected to Milvus at {}", self.endpoint);
        Ok(())
    }

    async fn disconnect(&self) -> AppResult<()> {
        let mut connected = self.connected.write().await;
        if *connected {
            *connected = false;
            *self.loaded.lock().await = false;
            info!("Disconnected from Milvus collection '{}'", self.collection);
        }
        Ok(())
    }

    #[instrument(skip(self, text, embedding, metadata), fields(collection = %self.collection, text_len = text.len()))]
    async fn insert(
        &self,
        text: &str,
        embedding: &[f32],
        metadata: Option<Metadata>,
    ) -> AppResult<Record> {
        check_dimension(self.dimension, embedding.len())?;
        self.require_connected().await?;

        let metadata = metadata.unwrap_or_default();
        let timestamp = now_timestamp();

        let body = json!({
            "collectionName": self.collection,
            "data": [{
                "embedding": embedding,
                "text": text,
                "metadata": encode_metadata(&metadata),
                "timestamp": timestamp
            }]
        });

        let result: InsertResult = self.call("entities/insert", body).await?;

        if self.flush_on_insert {
            self.call::<Value>("collections/flush", json!({"collectionName": self.collection}))
                .await?;
        }

        let id = result.insert_ids.first().map(render_id);
        debug!("Inserted record {:?} at {}", id, timestamp);

        Ok(Record {
            id,
            text: text.to_string(),
            embedding: embedding.to_vec(),
            metadata,
            timestamp,
        })
    }

    #[instrument(skip(self, query_embedding), fields(collection = %self.collection))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> AppResult<Vec<SearchHit>> {
        check_dimension(self.dimension, query_embedding.len())?;
        self.require_connected().await?;

        if limit == 0 {
            return Ok(Vec::new());
        }

        self.ensure_loaded().await?;

        let body = json!({
            "collectionName": self.collection,
            "data": [query_embedding],
            "annsField": "embedding",
            "limit": limit,
            "outputFields": OUTPUT_FIELDS,
            "searchParams": {
                "metricType": "L2",
                "params": {"nprobe": self.nprobe}
            }
        });

        let data: Value = match self.call("entities/search", body).await {
            Ok(data) => data,
            Err(e) => {
                // The collection may have been released; load again next time
                warn!("Milvus search failed, clearing load state: {}", e);
                *self.loaded.lock().await = false;
                return Err(e);
            }
        };
        let hits: Vec<Hit> = if data.is_array() {
            serde_json::from_value(data).map_err(|e| {
                AppError::Backend(format!("Unexpected Milvus search payload: {}", e))
            })?
        } else {
            Vec::new()
        };

        let mut results: Vec<SearchHit> = hits
            .into_iter()
            .take(limit)
            .map(|hit| SearchHit {
                text: hit.text,
                metadata: decode_metadata(&hit.metadata),
                timestamp: hit.timestamp,
                distance: hit.distance,
            })
            .collect();

        Metric::L2.sort_hits(&mut results);
        debug!("Milvus returned {} hits", results.len());

        Ok(results)
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn delete_by_timestamp(&self, threshold: i64) -> AppResult<DeleteOutcome> {
        self.require_connected().await?;

        let filter = format!("timestamp < {}", threshold);
        let result: DeleteResult = self
            .call(
                "entities/delete",
                json!({"collectionName": self.collection, "filter": filter}),
            )
            .await?;

        info!(
            "Deleted Milvus records older than {} (count: {:?})",
            threshold, result.delete_count
        );

        Ok(DeleteOutcome::Completed {
            deleted: result.delete_count,
        })
    }
}
