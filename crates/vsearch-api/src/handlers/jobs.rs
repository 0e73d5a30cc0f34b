//! Job status handler.

use axum::extract::{Path, State};
use axum::Json;

use vsearch_models::{IngestReport, JobId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Fetch the ingestion report for a job.
///
/// Reports are written by the worker at every stage transition, so a
/// running job shows the stage it is currently in.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<IngestReport>> {
    let job_id = JobId(job_id);
    match state.status.fetch(&job_id).await? {
        Some(report) => Ok(Json(report)),
        None => Err(ApiError::not_found(format!("No status for job {}", job_id))),
    }
}
