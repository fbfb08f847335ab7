//! Route handlers and the error body they share

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use super::AppState;
use crate::error::DiffExpError;
use crate::io::AnalysisResult;
use crate::service::DiffExpRequest;

/// Error response: `{"detail": "..."}` with a 400 or 500 status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<DiffExpError> for ApiError {
    fn from(err: DiffExpError) -> Self {
        if err.is_client_error() {
            ApiError::bad_request(err.to_string())
        } else {
            log::error!("Internal error: {}", err);
            ApiError::internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// POST /diffexp
///
/// The pipeline is CPU-bound and synchronous, so it runs on the blocking pool.
pub async fn diffexp(
    State(state): State<AppState>,
    payload: Result<Json<DiffExpRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || service.analyze(&request))
        .await
        .map_err(|e| ApiError::internal(format!("analysis task failed: {}", e)))??;
    Ok(Json(result))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
