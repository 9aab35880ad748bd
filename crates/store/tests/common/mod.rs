//! Fake Milvus and Pinecone HTTP servers for backend tests.
//!
//! Both keep their rows in memory and answer with the same envelopes the
//! real engines use, so the adapters run unmodified against them.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use vecgate_core::VectorStoreSettings;

pub const PINECONE_KEY: &str = "test-key";

pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// One-hot vector of length `dim` with a 1.0 at `hot`.
pub fn one_hot(dim: usize, hot: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[hot] = 1.0;
    v
}

// ---------------------------------------------------------------------------
// Milvus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MilvusRow {
    pub id: i64,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: String,
    pub timestamp: i64,
}

#[derive(Debug, Default)]
pub struct MilvusState {
    pub collections: HashMap<String, (usize, Vec<MilvusRow>)>,
    pub calls: Vec<String>,
    /// Collections that can be searched
    pub loaded: HashSet<String>,
    /// Collections still loading, with the polls left before they finish
    pub loading: HashMap<String, usize>,
    /// Polls a load takes before the collection reports loaded
    pub load_polls: usize,
    next_id: i64,
}

pub type SharedMilvus = Arc<Mutex<MilvusState>>;

pub struct FakeMilvus {
    pub state: SharedMilvus,
    pub settings: VectorStoreSettings,
}

impl FakeMilvus {
    pub async fn start() -> Self {
        let state: SharedMilvus = Arc::new(Mutex::new(MilvusState {
            next_id: 449_563_458_912,
            ..Default::default()
        }));

        let router = Router::new()
            .route("/v2/vectordb/collections/has", post(milvus_has))
            .route("/v2/vectordb/collections/create", post(milvus_create))
            .route("/v2/vectordb/collections/describe", post(milvus_describe))
            .route("/v2/vectordb/collections/flush", post(milvus_flush))
            .route("/v2/vectordb/collections/load", post(milvus_load))
            .route(
                "/v2/vectordb/collections/get_load_state",
                post(milvus_load_state),
            )
            .route("/v2/vectordb/entities/insert", post(milvus_insert))
            .route("/v2/vectordb/entities/search", post(milvus_search))
            .route("/v2/vectordb/entities/delete", post(milvus_delete))
            .with_state(state.clone());

        let base = serve(router).await;
        let (host, port) = base.rsplit_once(':').unwrap();

        let mut settings = VectorStoreSettings::default();
        settings.milvus.host = host.to_string();
        settings.milvus.port = port.parse().unwrap();
        settings.timeout_secs = 5;

        Self { state, settings }
    }

    /// Pre-create a collection as if another process had provisioned it.
    pub fn create_collection(&self, name: &str, dimension: usize) {
        self.state
            .lock()
            .unwrap()
            .collections
            .insert(name.to_string(), (dimension, Vec::new()));
    }

    /// Number of `get_load_state` polls a load takes to complete.
    pub fn set_load_polls(&self, polls: usize) {
        self.state.lock().unwrap().load_polls = polls;
    }

    /// Release a collection from memory, as another client could.
    pub fn release(&self, name: &str) {
        self.state.lock().unwrap().loaded.remove(name);
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.state.lock().unwrap().loaded.contains(name)
    }

    /// Store a row with an explicit timestamp.
    pub fn seed(&self, collection: &str, text: &str, embedding: Vec<f32>, timestamp: i64) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        let (_, rows) = state.collections.get_mut(collection).unwrap();
        rows.push(MilvusRow {
            id,
            embedding,
            text: text.to_string(),
            metadata: String::new(),
            timestamp,
        });
    }

    pub fn rows(&self, collection: &str) -> Vec<MilvusRow> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == path)
            .count()
    }
}

fn collection_name(body: &Value) -> String {
    body["collectionName"].as_str().unwrap_or_default().to_string()
}

fn milvus_error(code: i64, message: &str) -> Json<Value> {
    Json(json!({"code": code, "message": message}))
}

async fn milvus_has(State(state): State<SharedMilvus>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.calls.push("collections/has".to_string());
    let has = state.collections.contains_key(&collection_name(&body));
    Json(json!({"code": 0, "data": {"has": has}}))
}

async fn milvus_create(State(state): State<SharedMilvus>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.calls.push("collections/create".to_string());

    let dim = body["schema"]["fields"]
        .as_array()
        .and_then(|fields| fields.iter().find(|f| f["dataType"] == "FloatVector"))
        .and_then(|f| f["elementTypeParams"]["dim"].as_u64());
    let Some(dim) = dim else {
        return milvus_error(1100, "missing vector field");
    };

    let name = collection_name(&body);
    state.collections.insert(name.clone(), (dim as usize, Vec::new()));
    // Collections created with index params are loaded right away
    state.loaded.insert(name);
    Json(json!({"code": 0, "data": {}}))
}

async fn milvus_describe(State(state): State<SharedMilvus>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.calls.push("collections/describe".to_string());

    let name = collection_name(&body);
    match state.collections.get(&name) {
        Some((dim, _)) => Json(json!({
            "code": 0,
            "data": {
                "collectionName": name,
                "fields": [
                    {"name": "id", "type": "Int64", "primaryKey": true, "params": []},
                    {"name": "embedding", "type": "FloatVector", "params": [{"key": "dim", "value": dim.to_string()}]},
                    {"name": "text", "type": "VarChar", "params": [{"key": "max_length", "value": "65535"}]}
                ]
            }
        })),
        None => milvus_error(100, "collection not found"),
    }
}

fn milvus_touch(state: &SharedMilvus, path: &str, body: &Value) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.calls.push(path.to_string());
    if !state.collections.contains_key(&collection_name(body)) {
        return milvus_error(100, "collection not found");
    }
    Json(json!({"code": 0, "data": {}}))
}

async fn milvus_flush(State(state): State<SharedMilvus>, Json(body): Json<Value>) -> Json<Value> {
    milvus_touch(&state, "collections/flush", &body)
}

async fn milvus_load(State(state): State<SharedMilvus>, Json(body): Json<Value>) -> Json<Value> {
    let response = milvus_touch(&state, "collections/load", &body);
    let mut state = state.lock().unwrap();
    let name = collection_name(&body);
    if state.collections.contains_key(&name) && !state.loaded.contains(&name) {
        let polls = state.load_polls;
        state.loading.insert(name, polls);
    }
    response
}

async fn milvus_load_state(
    State(state): State<SharedMilvus>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.calls.push("collections/get_load_state".to_string());

    let name = collection_name(&body);
    if !state.collections.contains_key(&name) {
        return milvus_error(100, "collection not found");
    }

    let load_state = if state.loaded.contains(&name) {
        "LoadStateLoaded"
    } else {
        match state.loading.get(&name).copied() {
            Some(0) => {
                state.loading.remove(&name);
                state.loaded.insert(name);
                "LoadStateLoaded"
            }
            Some(left) => {
                state.loading.insert(name, left - 1);
                "LoadStateLoading"
            }
            None => "LoadStateNotLoad",
        }
    };

    let progress = if load_state == "LoadStateLoaded" { 100 } else { 0 };
    Json(json!({"code": 0, "data": {"loadState": load_state, "loadProgress": progress}}))
}

async fn milvus_insert(State(state): State<SharedMilvus>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.calls.push("entities/insert".to_string());

    let name = collection_name(&body);
    let Some(rows) = body["data"].as_array().cloned() else {
        return milvus_error(1100, "missing data");
    };

    let mut ids = Vec::new();
    for row in rows {
        state.next_id += 1;
        let id = state.next_id;
        let embedding: Vec<f32> = serde_json::from_value(row["embedding"].clone()).unwrap_or_default();
        let Some((dim, stored)) = state.collections.get_mut(&name) else {
            return milvus_error(100, "collection not found");
        };
        if embedding.len() != *dim {
            return milvus_error(1100, "the dim of the vector does not match");
        }
        stored.push(MilvusRow {
            id,
            embedding,
            text: row["text"].as_str().unwrap_or_default().to_string(),
            metadata: row["metadata"].as_str().unwrap_or_default().to_string(),
            timestamp: row["timestamp"].as_i64().unwrap_or_default(),
        });
        ids.push(id);
    }

    Json(json!({"code": 0, "data": {"insertCount": ids.len(), "insertIds": ids}}))
}

async fn milvus_search(State(state): State<SharedMilvus>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.calls.push("entities/search".to_string());

    let name = collection_name(&body);
    let limit = body["limit"].as_u64().unwrap_or(10) as usize;
    let query: Vec<f32> = serde_json::from_value(body["data"][0].clone()).unwrap_or_default();
    let Some((_, rows)) = state.collections.get(&name) else {
        return milvus_error(100, "collection not found");
    };
    if !state.loaded.contains(&name) {
        return milvus_error(101, "collection not loaded");
    }

    let mut scored: Vec<(f32, &MilvusRow)> = rows
        .iter()
        .map(|r| {
            let d: f32 = r
                .embedding
                .iter()
                .zip(&query)
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            (d, r)
        })
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    let hits: Vec<Value> = scored
        .into_iter()
        .take(limit)
        .map(|(distance, r)| {
            json!({
                "id": r.id,
                "distance": distance,
                "text": r.text,
                "metadata": r.metadata,
                "timestamp": r.timestamp
            })
        })
        .collect();

    Json(json!({"code": 0, "data": hits}))
}

async fn milvus_delete(State(state): State<SharedMilvus>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.calls.push("entities/delete".to_string());

    let name = collection_name(&body);
    let threshold = body["filter"]
        .as_str()
        .and_then(|f| f.strip_prefix("timestamp < "))
        .and_then(|t| t.trim().parse::<i64>().ok());
    let Some(threshold) = threshold else {
        return milvus_error(1100, "unsupported filter");
    };
    let Some((_, rows)) = state.collections.get_mut(&name) else {
        return milvus_error(100, "collection not found");
    };

    rows.retain(|r| r.timestamp >= threshold);
    Json(json!({"code": 0, "data": {}}))
}

// ---------------------------------------------------------------------------
// Pinecone
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PineconeVector {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: serde_json::Map<String, Value>,
}

#[derive(Debug, Default)]
pub struct PineconeIndex {
    pub dimension: usize,
    pub metric: String,
    pub vectors: Vec<PineconeVector>,
}

#[derive(Debug, Default)]
pub struct PineconeState {
    pub indexes: HashMap<String, PineconeIndex>,
    /// Base URL handed out as every index's data-plane host
    pub host: String,
}

pub type SharedPinecone = Arc<Mutex<PineconeState>>;

/// Control plane and data plane on one listener. The data-plane routes act
/// on the single index the test works with.
pub struct FakePinecone {
    pub state: SharedPinecone,
    pub settings: VectorStoreSettings,
}

impl FakePinecone {
    pub async fn start() -> Self {
        let state: SharedPinecone = Arc::new(Mutex::new(PineconeState::default()));

        let router = Router::new()
            .route("/indexes", get(pinecone_list).post(pinecone_create))
            .route("/indexes/{name}", get(pinecone_describe))
            .route("/vectors/upsert", post(pinecone_upsert))
            .route("/query", post(pinecone_query))
            .with_state(state.clone());

        let base = serve(router).await;
        state.lock().unwrap().host = base.clone();

        let mut settings = VectorStoreSettings::default();
        settings.backend = "pinecone".to_string();
        settings.pinecone.api_key = Some(PINECONE_KEY.to_string());
        settings.pinecone.environment = Some("us-east-1-aws".to_string());
        settings.pinecone.controller_url = base;
        settings.timeout_secs = 5;

        Self { state, settings }
    }

    pub fn create_index(&self, name: &str, dimension: usize) {
        self.state.lock().unwrap().indexes.insert(
            name.to_string(),
            PineconeIndex {
                dimension,
                metric: "cosine".to_string(),
                vectors: Vec::new(),
            },
        );
    }

    pub fn vector_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .indexes
            .get(name)
            .map(|i| i.vectors.len())
            .unwrap_or(0)
    }

    pub fn index(&self, name: &str) -> Option<(usize, String)> {
        self.state
            .lock()
            .unwrap()
            .indexes
            .get(name)
            .map(|i| (i.dimension, i.metric.clone()))
    }

    pub fn vectors(&self, name: &str) -> Vec<PineconeVector> {
        self.state
            .lock()
            .unwrap()
            .indexes
            .get(name)
            .map(|i| i.vectors.clone())
            .unwrap_or_default()
    }
}

fn authorized(headers: &HeaderMap) -> Result<(), StatusCode> {
    match headers.get("api-key").and_then(|v| v.to_str().ok()) {
        Some(PINECONE_KEY) => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn pinecone_list(
    State(state): State<SharedPinecone>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    let state = state.lock().unwrap();
    let indexes: Vec<Value> = state
        .indexes
        .iter()
        .map(|(name, index)| {
            json!({"name": name, "dimension": index.dimension, "metric": index.metric, "host": state.host})
        })
        .collect();
    Ok(Json(json!({"indexes": indexes})))
}

async fn pinecone_create(
    State(state): State<SharedPinecone>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    authorized(&headers)?;
    let mut state = state.lock().unwrap();

    let name = body["name"].as_str().unwrap_or_default().to_string();
    if state.indexes.contains_key(&name) {
        return Err(StatusCode::CONFLICT);
    }
    let dimension = body["dimension"].as_u64().unwrap_or_default() as usize;
    let metric = body["metric"].as_str().unwrap_or("cosine").to_string();
    state.indexes.insert(
        name.clone(),
        PineconeIndex {
            dimension,
            metric: metric.clone(),
            vectors: Vec::new(),
        },
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({"name": name, "dimension": dimension, "metric": metric, "host": state.host})),
    ))
}

async fn pinecone_describe(
    State(state): State<SharedPinecone>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    let state = state.lock().unwrap();
    let index = state.indexes.get(&name).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({
        "name": name,
        "dimension": index.dimension,
        "metric": index.metric,
        "host": state.host,
        "status": {"ready": true, "state": "Ready"}
    })))
}

async fn pinecone_upsert(
    State(state): State<SharedPinecone>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    let mut state = state.lock().unwrap();
    let index = state.indexes.values_mut().next().ok_or(StatusCode::NOT_FOUND)?;

    let vectors = body["vectors"].as_array().cloned().unwrap_or_default();
    for v in &vectors {
        let values: Vec<f32> = serde_json::from_value(v["values"].clone()).unwrap_or_default();
        if values.len() != index.dimension {
            return Err(StatusCode::BAD_REQUEST);
        }
        index.vectors.push(PineconeVector {
            id: v["id"].as_str().unwrap_or_default().to_string(),
            values,
            metadata: v["metadata"].as_object().cloned().unwrap_or_default(),
        });
    }

    Ok(Json(json!({"upsertedCount": vectors.len()})))
}

async fn pinecone_query(
    State(state): State<SharedPinecone>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    let state = state.lock().unwrap();
    let index = state.indexes.values().next().ok_or(StatusCode::NOT_FOUND)?;

    let query: Vec<f32> = serde_json::from_value(body["vector"].clone()).unwrap_or_default();
    let top_k = body["topK"].as_u64().unwrap_or(10) as usize;

    let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mut scored: Vec<(f32, &PineconeVector)> = index
        .vectors
        .iter()
        .map(|v| {
            let dot: f32 = v.values.iter().zip(&query).map(|(a, b)| a * b).sum();
            let denom = norm(&v.values) * norm(&query);
            (if denom == 0.0 { 0.0 } else { dot / denom }, v)
        })
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let matches: Vec<Value> = scored
        .into_iter()
        .take(top_k)
        .map(|(score, v)| json!({"id": v.id, "score": score, "metadata": v.metadata}))
        .collect();

    Ok(Json(json!({"matches": matches, "namespace": ""})))
}
