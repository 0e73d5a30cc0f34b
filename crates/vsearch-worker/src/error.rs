//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] vsearch_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] vsearch_media::MediaError),

    #[error("Vertex error: {0}")]
    Vertex(#[from] vsearch_vertex::VertexError),

    #[error("Queue error: {0}")]
    Queue(#[from] vsearch_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check whether retrying the whole job could help.
    ///
    /// An unreadable video stays unreadable, so decode errors fail the
    /// job immediately instead of cycling through retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Media(e) => !e.is_decode_error(),
            WorkerError::Storage(_) | WorkerError::Vertex(_) | WorkerError::Queue(_) => true,
            WorkerError::Io(_) => true,
            WorkerError::JobFailed(_) | WorkerError::ConfigError(_) => false,
        }
    }
}
