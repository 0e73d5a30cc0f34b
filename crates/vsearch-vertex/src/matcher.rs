//! Nearest-neighbor queries against the deployed index endpoint.
//!
//! The deployed index is served from its own host, not the regional API,
//! so this client carries its own base URL and endpoint resource path.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use vsearch_models::DatapointId;

use crate::client::VertexClient;
use crate::error::{VertexError, VertexResult};

/// One search result from the index.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub datapoint_id: DatapointId,
    pub distance: f64,
}

#[derive(Debug, Deserialize)]
struct FindNeighborsResponse {
    #[serde(rename = "nearestNeighbors", default)]
    nearest_neighbors: Vec<NearestNeighbors>,
}

#[derive(Debug, Deserialize)]
struct NearestNeighbors {
    #[serde(default)]
    neighbors: Vec<RawNeighbor>,
}

#[derive(Debug, Deserialize)]
struct RawNeighbor {
    datapoint: RawDatapoint,
    #[serde(default)]
    distance: f64,
}

#[derive(Debug, Deserialize)]
struct RawDatapoint {
    #[serde(rename = "datapointId")]
    datapoint_id: String,
}

/// Client for `findNeighbors` queries.
#[derive(Clone)]
pub struct MatchClient {
    client: VertexClient,
    /// Base URL of the deployed index endpoint host
    api_base: String,
    /// Index endpoint resource path, `projects/.../indexEndpoints/...`
    index_endpoint: String,
    /// Deployed index id within the endpoint
    deployed_index_id: String,
}

impl MatchClient {
    pub fn new(
        client: VertexClient,
        api_base: impl Into<String>,
        index_endpoint: impl Into<String>,
        deployed_index_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            index_endpoint: index_endpoint.into(),
            deployed_index_id: deployed_index_id.into(),
        }
    }

    /// Create with endpoint details from environment variables.
    pub fn from_env(client: VertexClient) -> VertexResult<Self> {
        let api_base = std::env::var("VERTEX_MATCH_API_BASE")
            .map_err(|_| VertexError::auth_error("VERTEX_MATCH_API_BASE not set"))?;
        let index_endpoint = std::env::var("VERTEX_INDEX_ENDPOINT")
            .map_err(|_| VertexError::auth_error("VERTEX_INDEX_ENDPOINT not set"))?;
        let deployed_index_id = std::env::var("VERTEX_DEPLOYED_INDEX_ID")
            .map_err(|_| VertexError::auth_error("VERTEX_DEPLOYED_INDEX_ID not set"))?;
        Ok(Self::new(client, api_base, index_endpoint, deployed_index_id))
    }

    /// Find the `neighbor_count` nearest datapoints to a query vector.
    pub async fn find_neighbors(
        &self,
        vector: &[f32],
        neighbor_count: u32,
    ) -> VertexResult<Vec<Neighbor>> {
        let body = json!({
            "deployedIndexId": self.deployed_index_id,
            "queries": [
                {
                    "datapoint": { "featureVector": vector },
                    "neighborCount": neighbor_count
                }
            ],
            "returnFullDatapoint": false
        });

        let url = format!("{}/v1/{}:findNeighbors", self.api_base, self.index_endpoint);
        let response = self.client.post_json("find_neighbors", &url, &body).await?;
        let parsed: FindNeighborsResponse = serde_json::from_value(response)?;

        let neighbors: Vec<Neighbor> = parsed
            .nearest_neighbors
            .into_iter()
            .next()
            .map(|nn| nn.neighbors)
            .unwrap_or_default()
            .into_iter()
            .map(|raw| Neighbor {
                datapoint_id: DatapointId::from(raw.datapoint.datapoint_id),
                distance: raw.distance,
            })
            .collect();

        debug!("findNeighbors returned {} results", neighbors.len());
        Ok(neighbors)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

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

    #[tokio::test]
    async fn test_find_neighbors_parses_results() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/p/locations/l/indexEndpoints/ep:findNeighbors"))
            .and(body_partial_json(json!({
                "deployedIndexId": "dep-1",
                "queries": [{"neighborCount": 4}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "nearestNeighbors": [{
                    "neighbors": [
                        {"datapoint": {"datapointId": "animals-part-0_3"}, "distance": 0.12},
                        {"datapoint": {"datapointId": "chicago-part-1_7"}, "distance": 0.34}
                    ]
                }]
            })))
            .mount(&server)
            .await;

        let matcher = MatchClient::new(
            test_client(&server),
            server.uri(),
            "projects/p/locations/l/indexEndpoints/ep",
            "dep-1",
        );

        let neighbors = matcher.find_neighbors(&[0.1, 0.2], 4).await.unwrap();
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].datapoint_id.as_str(), "animals-part-0_3");
        assert!((neighbors[0].distance - 0.12).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_find_neighbors_empty_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/projects/p/locations/l/indexEndpoints/ep:findNeighbors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let matcher = MatchClient::new(
            test_client(&server),
            server.uri(),
            "projects/p/locations/l/indexEndpoints/ep",
            "dep-1",
        );

        let neighbors = matcher.find_neighbors(&[0.1], 4).await.unwrap();
        assert!(neighbors.is_empty());
    }
}
