//! Multimodal embedding client.
//!
//! One request per segment: the service reads the segment object from
//! storage and returns one vector per `interval_sec` sub-interval, in
//! temporal order. Free text goes through the same model so queries and
//! video frames land in the same embedding space.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::VertexClient;
use crate::error::{VertexError, VertexResult};

/// Default published model for multimodal embeddings.
const DEFAULT_MODEL: &str = "multimodalembedding@001";

/// One vector for one sub-interval of a segment.
#[derive(Debug, Clone)]
pub struct VideoEmbedding {
    /// 1-based position within the segment, in response order
    pub sub_interval_index: usize,
    /// Feature vector
    pub vector: Vec<f32>,
    /// Start offset within the segment, when the service reports it
    pub start_offset_sec: Option<f64>,
    /// End offset within the segment, when the service reports it
    pub end_offset_sec: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(rename = "videoEmbeddings", default)]
    video_embeddings: Vec<RawVideoEmbedding>,
    #[serde(rename = "textEmbedding", default)]
    text_embedding: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct RawVideoEmbedding {
    embedding: Vec<f32>,
    #[serde(rename = "startOffsetSec", default)]
    start_offset_sec: Option<f64>,
    #[serde(rename = "endOffsetSec", default)]
    end_offset_sec: Option<f64>,
}

/// Client for the multimodal embedding model.
#[derive(Clone)]
pub struct EmbeddingClient {
    client: VertexClient,
    model: String,
}

impl EmbeddingClient {
    /// Create a new embedding client.
    pub fn new(client: VertexClient) -> Self {
        let model =
            std::env::var("VERTEX_EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self { client, model }
    }

    /// Embed one video segment at fixed sub-interval granularity.
    ///
    /// Returns vectors in sub-interval order with 1-based indices.
    /// Vectors are opaque; dimensionality is not validated here (the
    /// index rejects mismatched dimensions on upsert).
    pub async fn embed_video(
        &self,
        gcs_uri: &str,
        interval_sec: u32,
    ) -> VertexResult<Vec<VideoEmbedding>> {
        debug!("Requesting embeddings for {}", gcs_uri);

        let body = json!({
            "instances": [
                {
                    "video": {
                        "gcsUri": gcs_uri,
                        "videoSegmentConfig": {
                            "intervalSec": interval_sec
                        }
                    }
                }
            ]
        });

        let url = self.client.model_url(&self.model);
        let response = self.client.post_json("embed_video", &url, &body).await?;
        let parsed: PredictResponse = serde_json::from_value(response)?;

        let prediction = parsed
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| VertexError::invalid_response("Empty predictions array"))?;

        if prediction.video_embeddings.is_empty() {
            return Err(VertexError::invalid_response(format!(
                "No video embeddings returned for {}",
                gcs_uri
            )));
        }

        Ok(prediction
            .video_embeddings
            .into_iter()
            .enumerate()
            .map(|(i, raw)| VideoEmbedding {
                sub_interval_index: i + 1,
                vector: raw.embedding,
                start_offset_sec: raw.start_offset_sec,
                end_offset_sec: raw.end_offset_sec,
            })
            .collect())
    }

    /// Embed a free-text query.
    pub async fn embed_text(&self, query: &str) -> VertexResult<Vec<f32>> {
        let body = json!({
            "instances": [
                { "text": query }
            ]
        });

        let url = self.client.model_url(&self.model);
        let response = self.client.post_json("embed_text", &url, &body).await?;
        let parsed: PredictResponse = serde_json::from_value(response)?;

        parsed
            .predictions
            .into_iter()
            .next()
            .and_then(|p| p.text_embedding)
            .ok_or_else(|| VertexError::invalid_response("No text embedding returned"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::client::{VertexClient, VertexConfig};
    use crate::retry::RetryConfig;
    use crate::token_cache::TokenCache;

    use super::*;

    fn test_client(server: &MockServer, retry: RetryConfig) -> VertexClient {
        let config = VertexConfig {
            project_id: "test-project".to_string(),
            region: "us-central1".to_string(),
            api_base: server.uri(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(1),
            retry,
        };
        VertexClient::with_token_cache(config, Arc::new(TokenCache::with_static_token("t0k3n")))
    }

    fn predict_path() -> String {
        "/v1/projects/test-project/locations/us-central1/publishers/google/models/multimodalembedding@001:predict".to_string()
    }

    #[tokio::test]
    async fn test_embed_video_parses_sub_intervals_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(predict_path()))
            .and(header("authorization", "Bearer t0k3n"))
            .and(body_partial_json(json!({
                "instances": [{"video": {"gcsUri": "gs://parts/v1-part-0.mp4",
                                         "videoSegmentConfig": {"intervalSec": 5}}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{
                    "videoEmbeddings": [
                        {"embedding": [0.1, 0.2], "startOffsetSec": 0.0, "endOffsetSec": 5.0},
                        {"embedding": [0.3, 0.4], "startOffsetSec": 5.0, "endOffsetSec": 10.0}
                    ]
                }]
            })))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(test_client(&server, RetryConfig::none()));
        let embeddings = client
            .embed_video("gs://parts/v1-part-0.mp4", 5)
            .await
            .unwrap();

        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].sub_interval_index, 1);
        assert_eq!(embeddings[1].sub_interval_index, 2);
        assert_eq!(embeddings[0].vector, vec![0.1, 0.2]);
        assert_eq!(embeddings[1].end_offset_sec, Some(10.0));
    }

    #[tokio::test]
    async fn test_embed_video_surfaces_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(predict_path()))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid gcsUri"))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(test_client(&server, RetryConfig::none()));
        let err = client.embed_video("not-a-uri", 5).await.unwrap_err();

        match err {
            VertexError::Service { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid gcsUri"));
            }
            other => panic!("expected Service error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_embed_video_retries_transient_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(predict_path()))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(predict_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{
                    "videoEmbeddings": [{"embedding": [1.0]}]
                }]
            })))
            .with_priority(2)
            .mount(&server)
            .await;

        let retry = RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 2,
        };
        let client = EmbeddingClient::new(test_client(&server, retry));
        let embeddings = client.embed_video("gs://parts/x.mp4", 5).await.unwrap();

        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings[0].vector, vec![1.0]);
    }

    #[tokio::test]
    async fn test_embed_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(predict_path()))
            .and(body_partial_json(json!({"instances": [{"text": "tiger walking"}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{"textEmbedding": [0.5, 0.6, 0.7]}]
            })))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(test_client(&server, RetryConfig::none()));
        let vector = client.embed_text("tiger walking").await.unwrap();
        assert_eq!(vector, vec![0.5, 0.6, 0.7]);
    }

    #[tokio::test]
    async fn test_empty_predictions_is_invalid_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(predict_path()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"predictions": []})),
            )
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(test_client(&server, RetryConfig::none()));
        let err = client.embed_video("gs://parts/x.mp4", 5).await.unwrap_err();
        assert!(matches!(err, VertexError::InvalidResponse(_)));
    }
}
