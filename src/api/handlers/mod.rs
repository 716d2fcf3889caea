/// API request handlers
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use tracing::error;

use crate::api::types::ApiInfo;
use crate::api::types::ErrorBody;
use crate::api::types::HealthResponse;
use crate::api::types::JobStoreHealth;
use crate::config::AppConfig;
use crate::errors::ResearchError;
use crate::pipeline::ResearchPipeline;
use crate::store::JobStore;
use crate::store::ResultCache;

pub mod jobs;
pub mod research;

pub use jobs::*;
pub use research::*;

pub const API_NAME: &str = "Content Research Pipeline API";

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jobs: Arc<JobStore>,
    pub cache: Arc<ResultCache>,
    pub pipeline: Arc<ResearchPipeline>,
}

/// Error response carrying `{"detail": ...}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }
}

impl From<ResearchError> for ApiError {
    fn from(err: ResearchError) -> Self {
        match err {
            ResearchError::Validation(message) => Self::unprocessable(message),
            ResearchError::JobNotFound(id) => Self::not_found(format!("Job {id} not found")),
            other => {
                error!("Request failed: {}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Browser UI
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn api_info() -> Json<ApiInfo> {
    Json(ApiInfo {
        name: API_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        job_store: JobStoreHealth {
            backend: state.jobs.backend_name().to_string(),
            connected: state.jobs.is_connected().await,
        },
        cache_backend: state.cache.backend_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err = ApiError::from(ResearchError::Validation("Missing required credentials: google_cse_id".into()));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.detail, "Missing required credentials: google_cse_id");

        let err = ApiError::from(ResearchError::JobNotFound("abc".into()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.detail, "Job abc not found");

        let err = ApiError::from(ResearchError::StorageError("redis password=hunter2".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.detail.contains("hunter2"));
    }
}
