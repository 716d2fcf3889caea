/// Job creation
use axum::extract::State;
use axum::Json;
use tracing::info;

use super::ApiError;
use super::ApiResult;
use super::AppState;
use crate::api::runner;
use crate::api::types::ResearchRequest;
use crate::api::types::ResearchResponse;
use crate::models::JobRecord;
use crate::models::JobStatus;
use crate::models::MAX_RESULTS_LIMIT;
use crate::pipeline::Credentials;

/// Create a research job (POST /research)
///
/// Credentials are checked up front so a request that could never run does
/// not leave a job behind.
pub async fn create_research(
    State(state): State<AppState>,
    Json(request): Json<ResearchRequest>,
) -> ApiResult<ResearchResponse> {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::unprocessable("Query cannot be empty"));
    }

    if request.max_results.is_some_and(|n| n > MAX_RESULTS_LIMIT) {
        return Err(ApiError::unprocessable(format!(
            "max_results must be at most {MAX_RESULTS_LIMIT}"
        )));
    }

    let credentials = request.credentials();
    Credentials::resolve(&state.config.credentials, Some(&credentials))?;

    let job_id = uuid::Uuid::new_v4().to_string();
    let options = request.options();
    info!("POST /research: job {} for query: {}", job_id, query);

    state
        .jobs
        .create(JobRecord::new(&job_id, &query, options.clone()))
        .await?;

    runner::spawn_job(state.clone(), job_id.clone(), query, options, credentials);

    Ok(Json(ResearchResponse {
        message: format!(
            "Research job created successfully. Use /status/{job_id} to check progress."
        ),
        job_id,
        status: JobStatus::Pending,
    }))
}
