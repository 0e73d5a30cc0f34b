//! Vector Search index writer.
//!
//! Upsert is idempotent from the index's perspective: re-upserting an id
//! overwrites the stored vector, so duplicate pipeline runs cost storage
//! and compute but never corrupt the index.

use serde_json::json;
use tracing::{debug, info};

use vsearch_models::{DatapointId, UpsertResult};

use crate::client::VertexClient;
use crate::error::VertexResult;

/// Client for index write operations.
#[derive(Clone)]
pub struct IndexClient {
    client: VertexClient,
    index_id: String,
}

impl IndexClient {
    /// Create a new index client.
    pub fn new(client: VertexClient, index_id: impl Into<String>) -> Self {
        Self {
            client,
            index_id: index_id.into(),
        }
    }

    /// Create with the index id from `VERTEX_INDEX_ID`.
    pub fn from_env(client: VertexClient) -> VertexResult<Self> {
        let index_id = std::env::var("VERTEX_INDEX_ID").map_err(|_| {
            crate::error::VertexError::auth_error("VERTEX_INDEX_ID not set")
        })?;
        Ok(Self::new(client, index_id))
    }

    /// Upsert one datapoint, reporting the outcome per record.
    ///
    /// Transient failures are retried inside the client; whatever error
    /// survives the retry budget is captured in the result rather than
    /// propagated, so one bad record never aborts its siblings.
    pub async fn upsert(&self, id: &DatapointId, vector: &[f32]) -> UpsertResult {
        match self.try_upsert(id, vector).await {
            Ok(()) => {
                debug!("Upserted datapoint {}", id);
                UpsertResult::success(id.clone())
            }
            Err(e) => UpsertResult::error(id.clone(), e.to_string()),
        }
    }

    async fn try_upsert(&self, id: &DatapointId, vector: &[f32]) -> VertexResult<()> {
        let body = json!({
            "datapoints": [
                {
                    "datapointId": id.as_str(),
                    "featureVector": vector
                }
            ]
        });

        let url = self.client.index_url(&self.index_id, "upsertDatapoints");
        self.client.post_json("upsert_datapoints", &url, &body).await?;
        Ok(())
    }

    /// Remove a batch of datapoints by id.
    pub async fn remove(&self, ids: &[DatapointId]) -> VertexResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let body = json!({
            "datapoint_ids": ids.iter().map(|id| id.as_str()).collect::<Vec<_>>()
        });

        let url = self.client.index_url(&self.index_id, "removeDatapoints");
        self.client.post_json("remove_datapoints", &url, &body).await?;

        info!("Removed {} datapoints from index {}", ids.len(), self.index_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use vsearch_models::UpsertStatus;

    use crate::client::{VertexClient, VertexConfig};
    use crate::retry::RetryConfig;
    use crate::token_cache::TokenCache;

    use super::*;

    fn test_client(server: &MockServer) -> VertexClient {
        let config = VertexConfig {
            project_id: "test-project".to_string(),
            region: "us-central1".to_string(),
            api_base: server.uri(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(1),
            retry: RetryConfig::none(),
        };
        VertexClient::with_token_cache(config, Arc::new(TokenCache::with_static_token("t0k3n")))
    }

    const INDEX_PATH: &str =
        "/v1/projects/test-project/locations/us-central1/indexes/idx-1:upsertDatapoints";

    #[tokio::test]
    async fn test_upsert_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(INDEX_PATH))
            .and(body_partial_json(json!({
                // f32-exact values so the serialized body matches bit for bit
                "datapoints": [{"datapointId": "v1-part-0_1", "featureVector": [0.5, 0.25]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let index = IndexClient::new(test_client(&server), "idx-1");
        let result = index
            .upsert(&DatapointId::new("v1-part-0", 1), &[0.5, 0.25])
            .await;

        assert_eq!(result.status, UpsertStatus::Success);
        assert_eq!(result.id.as_str(), "v1-part-0_1");
    }

    #[tokio::test]
    async fn test_upsert_failure_is_captured_not_propagated() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(INDEX_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("dimension mismatch"))
            .mount(&server)
            .await;

        let index = IndexClient::new(test_client(&server), "idx-1");
        let result = index.upsert(&DatapointId::new("v1-part-0", 1), &[0.1]).await;

        assert_eq!(result.status, UpsertStatus::Error);
        assert!(result.error.unwrap().contains("dimension mismatch"));
    }

    #[tokio::test]
    async fn test_remove_sends_all_ids() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(
                "/v1/projects/test-project/locations/us-central1/indexes/idx-1:removeDatapoints",
            ))
            .and(body_partial_json(json!({
                "datapoint_ids": ["v1-part-0_1", "v1-part-0_2"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let index = IndexClient::new(test_client(&server), "idx-1");
        index
            .remove(&[
                DatapointId::new("v1-part-0", 1),
                DatapointId::new("v1-part-0", 2),
            ])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_remove_empty_batch_is_noop() {
        let server = MockServer::start().await;
        // No mock mounted: a request would fail the test.
        let index = IndexClient::new(test_client(&server), "idx-1");
        index.remove(&[]).await.unwrap();
    }
}
