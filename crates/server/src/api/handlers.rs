//! Request handlers and their wire types.

use super::error::ApiError;
use super::AppState;
use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use vecgate_chat::ChatTurn;
use vecgate_store::{BackendCapabilities, DeleteOutcome, Metadata, SearchHit, VectorBackend};

const DEFAULT_SEARCH_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    pub text: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

fn default_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
}

impl StatusResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: String,
    pub dimension: usize,
    pub capabilities: BackendCapabilities,
}

#[instrument(skip(state, request), fields(text_len = request.text.len()))]
pub async fn embed(
    State(state): State<AppState>,
    Json(request): Json<EmbedRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let record = state
        .service
        .embed_and_store(&request.text, request.metadata)
        .await?;
    debug!("Stored record {:?} at {}", record.id, record.timestamp);

    Ok(Json(StatusResponse::success("Embedding created and stored")))
}

#[instrument(skip(state, request), fields(limit = request.limit))]
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let results = state
        .service
        .embed_and_search(&request.query, request.limit)
        .await?;

    Ok(Json(SearchResponse { results }))
}

#[instrument(skip(state))]
pub async fn cleanup(
    State(state): State<AppState>,
    Path(timestamp): Path<i64>,
) -> Result<Json<StatusResponse>, ApiError> {
    let outcome = state.service.purge_before(timestamp).await?;

    Ok(Json(StatusResponse::success(describe_cleanup(
        state.service.backend().as_ref(),
        timestamp,
        outcome,
    ))))
}

#[instrument(skip(state, request), fields(message_len = request.message.len()))]
pub async fn chat(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatTurn>, ApiError> {
    let turn = state.chat.send(&user_id, &request.message).await?;
    Ok(Json(turn))
}

#[instrument(skip(state))]
pub async fn chat_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ChatTurn>>, ApiError> {
    Ok(Json(state.chat.history(&user_id).await?))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend = state.service.backend();
    Json(HealthResponse {
        status: "ok",
        backend: backend.backend_name().to_string(),
        dimension: backend.dimension(),
        capabilities: backend.capabilities(),
    })
}

/// Human-readable summary of a delete-older-than call.
pub fn describe_cleanup(
    backend: &dyn VectorBackend,
    timestamp: i64,
    outcome: DeleteOutcome,
) -> String {
    if !backend.capabilities().delete_by_timestamp {
        return format!(
            "Backend '{}' does not support deleting by timestamp; entries older than {} were kept",
            backend.backend_name(),
            timestamp
        );
    }

    match outcome {
        DeleteOutcome::Completed { deleted: Some(count) } => {
            format!("Deleted {} entries older than {}", count, timestamp)
        }
        DeleteOutcome::Completed { deleted: None } => {
            format!("Deleted entries older than {}", timestamp)
        }
        DeleteOutcome::Unsupported => format!(
            "Backend '{}' skipped deleting entries older than {}",
            backend.backend_name(),
            timestamp
        ),
    }
}
