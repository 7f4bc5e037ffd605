use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::{domain::HistoryInfo, error::HistoryError, service::HistoryService};

#[cfg(test)]
mod tests;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<HistoryService>,
}

#[derive(Debug)]
pub struct ApiError {
    code: &'static str,
    message: String,
    status: StatusCode,
}

impl ApiError {
    fn new(code: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal", StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<HistoryError> for ApiError {
    fn from(value: HistoryError) -> Self {
        let status = match value {
            HistoryError::InvalidParams { .. }
            | HistoryError::InvalidConnectionId
            | HistoryError::InvalidTimestamp { .. } => StatusCode::BAD_REQUEST,
            HistoryError::NotConfigured | HistoryError::Initialization { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            HistoryError::BucketMissing { .. } | HistoryError::Persistence { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError::new(value.code(), status, value.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(code = self.code, message = %self.message, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct Items<T> {
    items: Vec<T>,
}

#[derive(Serialize)]
struct AddResponse {
    result: crate::service::AddReply,
}

pub fn build_router(service: Arc<HistoryService>) -> Router {
    let app_state = AppState { service };

    let api = Router::new()
        .route("/health", get(health))
        .route("/history", get(get_history_list).post(add_history));

    Router::new()
        .nest("/api", api)
        .layer(Extension(app_state))
}

async fn health(Extension(state): Extension<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "configured": state.service.is_configured(),
    }))
}

// The body is handed to the facade as-is so envelope errors are reported the
// same way for every transport.
async fn add_history(
    Extension(state): Extension<AppState>,
    body: String,
) -> Result<Json<AddResponse>, ApiError> {
    let service = state.service.clone();
    let result = run_blocking(move || service.add(&body)).await??;
    Ok(Json(AddResponse { result }))
}

async fn get_history_list(
    Extension(state): Extension<AppState>,
) -> Result<Json<Items<HistoryInfo>>, ApiError> {
    let service = state.service.clone();
    let items = run_blocking(move || service.get_list("")).await??;
    Ok(Json(Items { items }))
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("history task failed: {e}")))
}
