//! Job types for the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vsearch_models::{JobId, SourceVideo, VideoId};

/// Job to ingest one uploaded video: download, segment, upload parts,
/// embed, and index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestVideoJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Video object named by the storage-change notification
    pub video: SourceVideo,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl IngestVideoJob {
    /// Create a new ingest job from a storage-change notification.
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            video: SourceVideo::new(bucket, name),
            created_at: Utc::now(),
        }
    }

    /// Video id derived from the object name.
    pub fn video_id(&self) -> VideoId {
        self.video.video_id()
    }

    /// Idempotency key for deduplication. Redelivered notifications for
    /// the same object map to the same key while the first run is in
    /// flight.
    pub fn idempotency_key(&self) -> String {
        format!("ingest:{}:{}", self.video.bucket, self.video.name)
    }
}

/// Job to delete every trace of a video: index datapoints, archival
/// objects, and uploaded segment parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteVideoJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Video to delete
    pub video_id: VideoId,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl DeleteVideoJob {
    pub fn new(video_id: VideoId) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            created_at: Utc::now(),
        }
    }

    /// Idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("delete:{}", self.video_id)
    }
}

/// Any job that can appear on the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueJob {
    /// Full ingestion pipeline for an uploaded video
    IngestVideo(IngestVideoJob),
    /// Remove a video's datapoints and stored objects
    DeleteVideo(DeleteVideoJob),
}

impl QueueJob {
    pub fn job_id(&self) -> &JobId {
        match self {
            QueueJob::IngestVideo(j) => &j.job_id,
            QueueJob::DeleteVideo(j) => &j.job_id,
        }
    }

    pub fn idempotency_key(&self) -> String {
        match self {
            QueueJob::IngestVideo(j) => j.idempotency_key(),
            QueueJob::DeleteVideo(j) => j.idempotency_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_job_idempotency_key_tracks_bucket_and_name() {
        let a = IngestVideoJob::new("b", "x.mp4");
        let b = IngestVideoJob::new("b", "x.mp4");
        let c = IngestVideoJob::new("b", "y.mp4");
        // Distinct job ids, same dedup key for the same object
        assert_ne!(a.job_id, b.job_id);
        assert_eq!(a.idempotency_key(), b.idempotency_key());
        assert_ne!(a.idempotency_key(), c.idempotency_key());
    }

    #[test]
    fn test_ingest_job_video_id() {
        let job = IngestVideoJob::new("b", "x.mp4");
        assert_eq!(job.video_id().as_str(), "x");
    }

    #[test]
    fn test_queue_job_serde_roundtrip() {
        let job = QueueJob::IngestVideo(IngestVideoJob::new("b", "x.mp4"));
        let json = serde_json::to_string(&job).expect("serialize QueueJob");
        assert!(json.contains("\"type\":\"ingest_video\""));
        let decoded: QueueJob = serde_json::from_str(&json).expect("deserialize QueueJob");
        assert_eq!(decoded.job_id(), job.job_id());
        assert_eq!(decoded.idempotency_key(), "ingest:b:x.mp4");
    }

    #[test]
    fn test_delete_job_key() {
        let job = DeleteVideoJob::new(VideoId::from("v1"));
        assert_eq!(job.idempotency_key(), "delete:v1");
    }
}
