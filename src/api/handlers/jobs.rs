/// Job status, listing and deletion
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::Json;
use tracing::info;
use tracing::warn;

use super::ApiError;
use super::ApiResult;
use super::AppState;
use crate::api::types::JobsQuery;
use crate::api::types::MessageResponse;
use crate::errors::ResearchError;
use crate::models::JobListing;
use crate::models::JobRecord;
use crate::models::JobStatus;

/// Get job status (GET /status/:job_id)
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<JobRecord> {
    match state.jobs.get(&job_id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ResearchError::JobNotFound(job_id).into()),
    }
}

/// List jobs, newest first (GET /jobs)
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> ApiResult<JobListing> {
    let status = match query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(raw.parse::<JobStatus>().map_err(ApiError::unprocessable)?),
        None => None,
    };

    Ok(Json(state.jobs.list(query.limit, status).await?))
}

/// Delete a finished job and its report (DELETE /jobs/:job_id)
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let record = state
        .jobs
        .get(&job_id)
        .await?
        .ok_or_else(|| ResearchError::JobNotFound(job_id.clone()))?;

    if !record.status.is_terminal() {
        return Err(ApiError::bad_request("Cannot delete a job that is still running"));
    }

    if !state.jobs.delete(&job_id).await? {
        return Err(ResearchError::JobNotFound(job_id).into());
    }

    if let Err(e) = state.pipeline.reports().remove(&job_id).await {
        warn!("Failed to remove report for job {}: {}", job_id, e);
    }

    info!("🗑️ Deleted job {}", job_id);
    Ok(Json(MessageResponse {
        message: format!("Job {job_id} deleted successfully"),
    }))
}
