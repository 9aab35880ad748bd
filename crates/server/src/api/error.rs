use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use vecgate_core::AppError;

/// Error returned by every handler.
///
/// Unusable input is `400`; every other failure collapses into
/// `500 {"detail": "..."}` and the error kind is only visible in the
/// message and the server log.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::InvalidInput(_) => {
                tracing::warn!("Rejected request: {}", self.0);
                StatusCode::BAD_REQUEST
            }
            _ => {
                tracing::error!("Request failed: {}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}
