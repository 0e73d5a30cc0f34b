//! Application state.

use std::sync::Arc;

use vsearch_queue::{JobQueue, JobStatusStore};
use vsearch_storage::StorageClient;
use vsearch_vertex::{EmbeddingClient, MatchClient, VertexClient};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<StorageClient>,
    pub queue: Arc<JobQueue>,
    pub status: Arc<JobStatusStore>,
    pub embedding: EmbeddingClient,
    pub matcher: MatchClient,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let storage = StorageClient::from_env()?;
        let queue = JobQueue::from_env()?;

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let status = JobStatusStore::new(&redis_url)?;

        let vertex = VertexClient::from_env().await?;
        let embedding = EmbeddingClient::new(vertex.clone());
        let matcher = MatchClient::from_env(vertex)?;

        Ok(Self {
            config,
            storage: Arc::new(storage),
            queue: Arc::new(queue),
            status: Arc::new(status),
            embedding,
            matcher,
        })
    }
}
