//! Ingestion notification handler.
//!
//! Storage-change notifications are pushed here when an object lands in
//! the source bucket. The handler only validates, enqueues, and acks:
//! the pipeline itself runs in the worker, so the delivery deadline of
//! the push subscription is never at risk.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use vsearch_queue::IngestVideoJob;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response to an accepted notification.
///
/// The body deliberately stays a plain confirmation string: push
/// deliveries only check the status code.
#[derive(Serialize)]
pub struct IngestResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// Handle a storage-change notification.
///
/// Accepts either a bare `{bucket, name}` object or an event envelope
/// with those fields nested under `data`. Redelivered notifications for
/// an in-flight object are acknowledged without enqueueing again.
pub async fn ingest(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<Json<IngestResponse>> {
    let (bucket, name) = parse_notification(&payload)
        .ok_or_else(|| ApiError::bad_request("Notification is missing bucket or name"))?;

    info!("Notification for gs://{}/{}", bucket, name);

    let job = IngestVideoJob::new(&bucket, &name);
    let job_id = job.job_id.to_string();

    let enqueued = state.queue.enqueue_ingest(job).await;
    let response = ack_response(&bucket, job_id, enqueued)?;
    if response.job_id.is_some() {
        crate::metrics::record_job_enqueued("ingest_video");
    }
    Ok(Json(response))
}

/// Map an enqueue outcome to the ack body.
///
/// Both a fresh enqueue and a duplicate rejection ack with 200 and a
/// body naming the bucket; anything else surfaces as an error so the
/// notification is redelivered.
fn ack_response(
    bucket: &str,
    job_id: String,
    enqueued: Result<String, vsearch_queue::QueueError>,
) -> ApiResult<IngestResponse> {
    match enqueued {
        Ok(_) => Ok(IngestResponse {
            message: format!("Received - {}", bucket),
            job_id: Some(job_id),
        }),
        Err(e) if e.is_duplicate() => {
            // Same object already in flight; ack so the notification
            // is not redelivered forever.
            warn!("Duplicate notification acknowledged for bucket '{}'", bucket);
            Ok(IngestResponse {
                message: format!("Received - {}", bucket),
                job_id: None,
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Pull `(bucket, name)` out of a notification payload.
fn parse_notification(payload: &serde_json::Value) -> Option<(String, String)> {
    let body = payload.get("data").unwrap_or(payload);
    let bucket = body.get("bucket")?.as_str()?;
    let name = body.get("name")?.as_str()?;
    if bucket.is_empty() || name.is_empty() {
        return None;
    }
    Some((bucket.to_string(), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_notification() {
        let payload = json!({"bucket": "videos-in", "name": "talk.mp4"});
        assert_eq!(
            parse_notification(&payload),
            Some(("videos-in".to_string(), "talk.mp4".to_string()))
        );
    }

    #[test]
    fn parses_enveloped_notification() {
        let payload = json!({
            "specversion": "1.0",
            "type": "google.cloud.storage.object.v1.finalized",
            "data": {"bucket": "videos-in", "name": "talks/talk.mp4", "size": "123"}
        });
        assert_eq!(
            parse_notification(&payload),
            Some(("videos-in".to_string(), "talks/talk.mp4".to_string()))
        );
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(parse_notification(&json!({"bucket": "videos-in"})).is_none());
        assert!(parse_notification(&json!({"name": "talk.mp4"})).is_none());
        assert!(parse_notification(&json!({"bucket": "", "name": "talk.mp4"})).is_none());
        assert!(parse_notification(&json!({"data": {}})).is_none());
    }

    #[test]
    fn acks_with_bucket_in_body_before_any_pipeline_work() {
        // The notification for {bucket: "b", name: "x.mp4"} is acked with
        // 200 and a body naming the bucket as soon as the job is queued.
        let response = ack_response("b", "job-1".to_string(), Ok("1-0".to_string()))
            .expect("fresh enqueue acks");
        assert_eq!(response.message, "Received - b");
        assert_eq!(response.job_id.as_deref(), Some("job-1"));
    }

    #[test]
    fn duplicate_delivery_still_acks() {
        let err = vsearch_queue::QueueError::DuplicateJob("ingest:b:x.mp4".to_string());
        let response = ack_response("b", "job-2".to_string(), Err(err))
            .expect("duplicate acks instead of erroring");
        assert_eq!(response.message, "Received - b");
        assert!(response.job_id.is_none());
    }

    #[test]
    fn queue_failure_is_not_acked() {
        let err = vsearch_queue::QueueError::enqueue_failed("redis down");
        let result = ack_response("b", "job-3".to_string(), Err(err));
        assert!(matches!(result, Err(ApiError::Queue(_))));
    }
}
