//! Worker configuration.

use std::time::Duration;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Maximum segments processed in parallel within a single job
    pub max_segment_parallel: usize,
    /// Segment length in seconds
    pub segment_interval_secs: u32,
    /// Sub-interval length requested from the embedding model, in seconds
    pub embed_interval_secs: u32,
    /// Bucket that receives segment files
    pub parts_bucket: String,
    /// Optional second bucket that receives a copy of every segment
    pub replica_bucket: Option<String>,
    /// Bucket that receives archival embedding records
    pub archive_bucket: String,
    /// Work directory for temporary files
    pub work_dir: String,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// How often the worker should scan for orphaned pending jobs
    pub claim_interval: Duration,
    /// Minimum idle time before a pending job can be claimed (crash recovery)
    pub claim_min_idle: Duration,
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let parts_bucket = std::env::var("PARTS_BUCKET")
            .map_err(|_| WorkerError::config_error("PARTS_BUCKET not set"))?;
        let archive_bucket = std::env::var("ARCHIVE_BUCKET")
            .map_err(|_| WorkerError::config_error("ARCHIVE_BUCKET not set"))?;

        Ok(Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            max_segment_parallel: std::env::var("WORKER_MAX_SEGMENT_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
            segment_interval_secs: std::env::var("SEGMENT_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
            embed_interval_secs: std::env::var("EMBED_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            parts_bucket,
            replica_bucket: std::env::var("REPLICA_BUCKET").ok().filter(|s| !s.is_empty()),
            archive_bucket,
            work_dir: std::env::var("WORKER_WORK_DIR")
                .unwrap_or_else(|_| "/tmp/vsearch".to_string()),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            claim_min_idle: Duration::from_secs(
                std::env::var("WORKER_CLAIM_MIN_IDLE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        })
    }
}
