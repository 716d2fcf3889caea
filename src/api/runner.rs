//! Background execution of research jobs

use std::time::Duration;

use tracing::error;
use tracing::info;
use tracing::warn;

use crate::api::handlers::AppState;
use crate::config::CredentialsConfig;
use crate::errors::ResearchError;
use crate::models::JobUpdate;
use crate::models::PipelineResult;
use crate::models::ResearchOptions;
use crate::Result;

const START_ATTEMPTS: u32 = 3;
const START_RETRY_DELAY: Duration = Duration::from_millis(200);

pub fn report_url(job_id: &str) -> String {
    format!("/reports/{job_id}.html")
}

/// Run the job on its own task; the request that created it does not wait.
///
/// The pipeline runs on a nested task so a panic surfaces as a `JoinError`
/// and still marks the job failed.
pub fn spawn_job(
    state: AppState,
    job_id: String,
    query: String,
    options: ResearchOptions,
    credentials: CredentialsConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !mark_running(&state, &job_id).await {
            return;
        }

        let pipeline = state.pipeline.clone();
        let run_id = job_id.clone();
        let outcome = tokio::spawn(async move {
            pipeline
                .run_with_id(&run_id, &query, options, Some(&credentials))
                .await
        })
        .await;

        let update = match outcome {
            Ok(Ok(result)) => finished(&job_id, result),
            Ok(Err(e)) => {
                error!("❌ Job {} failed: {}", job_id, e);
                JobUpdate::failed(e.to_string(), None)
            }
            Err(join_error) => {
                error!("❌ Job {} aborted: {}", job_id, join_error);
                JobUpdate::failed(format!("Job aborted: {join_error}"), None)
            }
        };

        if let Err(e) = record(&state, &job_id, update).await {
            error!("Failed to record outcome of job {}: {}", job_id, e);
        }
    })
}

/// Move the job to running, retrying briefly when the store errors.
///
/// Returns false when the job is gone or the store stayed unwritable; the
/// pipeline is not started in either case.
async fn mark_running(state: &AppState, job_id: &str) -> bool {
    for attempt in 1..=START_ATTEMPTS {
        match state.jobs.update(job_id, JobUpdate::running()).await {
            Ok(Some(_)) => return true,
            Ok(None) => {
                warn!("Job {} was removed before it started", job_id);
                return false;
            }
            Err(e @ ResearchError::InvalidTransition { .. }) => {
                error!("Job {} cannot start: {}", job_id, e);
                return false;
            }
            Err(e) if attempt < START_ATTEMPTS => {
                warn!(
                    "Failed to mark job {} running (attempt {}/{}): {}",
                    job_id, attempt, START_ATTEMPTS, e
                );
                tokio::time::sleep(START_RETRY_DELAY * attempt).await;
            }
            Err(e) => {
                error!(
                    "❌ Giving up on job {} after {} attempts to mark it running: {}",
                    job_id, START_ATTEMPTS, e
                );
            }
        }
    }
    false
}

fn finished(job_id: &str, result: PipelineResult) -> JobUpdate {
    let summary = result.summary();
    if result.is_completed() {
        info!("✅ Job {} completed", job_id);
        JobUpdate::completed(summary, Some(report_url(job_id)))
    } else {
        let message = result
            .state
            .error
            .clone()
            .unwrap_or_else(|| "Research pipeline failed".to_string());
        warn!("Job {} finished with failure: {}", job_id, message);
        JobUpdate::failed(message, Some(summary))
    }
}

async fn record(state: &AppState, job_id: &str, update: JobUpdate) -> Result<()> {
    if state.jobs.update(job_id, update).await?.is_none() {
        warn!("Job {} was removed before it finished", job_id);
    }
    Ok(())
}
