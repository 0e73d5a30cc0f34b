//! Per-job status records in Redis.

use redis::AsyncCommands;

use vsearch_models::{IngestReport, JobId};

use crate::error::QueueResult;

/// Store for job status records.
///
/// Each record is the serialized [`IngestReport`] for a job, kept under a
/// TTL so finished jobs age out on their own.
pub struct JobStatusStore {
    client: redis::Client,
    ttl_secs: u64,
}

impl JobStatusStore {
    /// Create a new status store.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let ttl_secs = std::env::var("JOB_STATUS_TTL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);
        Ok(Self { client, ttl_secs })
    }

    /// Get the status key for a job.
    pub fn status_key(job_id: &JobId) -> String {
        format!("vsearch:status:{}", job_id)
    }

    /// Write the current report for a job.
    pub async fn record(&self, job_id: &JobId, report: &IngestReport) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(report)?;
        conn.set_ex::<_, _, ()>(Self::status_key(job_id), payload, self.ttl_secs)
            .await?;
        Ok(())
    }

    /// Fetch the report for a job, if one exists.
    pub async fn fetch(&self, job_id: &JobId) -> QueueResult<Option<IngestReport>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(Self::status_key(job_id)).await?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }
}
