//! Video deletion handler.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use vsearch_models::VideoId;
use vsearch_queue::DeleteVideoJob;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct DeleteVideoResponse {
    pub video_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// Queue removal of a video's datapoints and stored objects.
///
/// Deletion runs in the worker like ingestion does, so this returns 202
/// as soon as the job is on the queue.
pub async fn delete_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<(StatusCode, Json<DeleteVideoResponse>)> {
    if video_id.trim().is_empty() {
        return Err(ApiError::bad_request("Video id must not be empty"));
    }

    let video_id = VideoId::from_string(video_id);
    let job = DeleteVideoJob::new(video_id.clone());
    let job_id = job.job_id.to_string();

    info!("Queueing deletion of video '{}'", video_id);

    match state.queue.enqueue_delete(job).await {
        Ok(_) => {
            crate::metrics::record_job_enqueued("delete_video");
            Ok((
                StatusCode::ACCEPTED,
                Json(DeleteVideoResponse {
                    video_id: video_id.as_str().to_string(),
                    status: "queued".to_string(),
                    job_id: Some(job_id),
                }),
            ))
        }
        Err(e) if e.is_duplicate() => Ok((
            StatusCode::ACCEPTED,
            Json(DeleteVideoResponse {
                video_id: video_id.as_str().to_string(),
                status: "already_queued".to_string(),
                job_id: None,
            }),
        )),
        Err(e) => Err(e.into()),
    }
}
