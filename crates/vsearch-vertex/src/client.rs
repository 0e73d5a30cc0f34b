//! Shared Vertex AI REST client.
//!
//! Holds the pooled HTTP client, the token cache, and the retry policy
//! that the embedding, index, and match clients all go through.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::{VertexError, VertexResult};
use crate::metrics::record_request;
use crate::retry::{with_retry, RetryConfig};
use crate::token_cache::TokenCache;

/// Vertex AI client configuration.
#[derive(Debug, Clone)]
pub struct VertexConfig {
    /// GCP project ID
    pub project_id: String,
    /// Vertex AI region
    pub region: String,
    /// Base URL of the regional AI Platform API. Defaults to
    /// `https://{region}-aiplatform.googleapis.com`; overridable for tests.
    pub api_base: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry policy
    pub retry: RetryConfig,
}

impl VertexConfig {
    /// Create config from environment variables.
    pub fn from_env() -> VertexResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID").map_err(|_| {
            VertexError::auth_error("GCP_PROJECT_ID must be set to reach Vertex AI")
        })?;
        if project_id.is_empty() {
            return Err(VertexError::auth_error("GCP_PROJECT_ID cannot be empty"));
        }

        let region = std::env::var("VERTEX_REGION").unwrap_or_else(|_| "us-central1".to_string());
        let api_base = std::env::var("VERTEX_API_BASE")
            .unwrap_or_else(|_| format!("https://{}-aiplatform.googleapis.com", region));

        Ok(Self {
            project_id,
            region,
            api_base,
            timeout: Duration::from_secs(
                std::env::var("VERTEX_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::from_env(),
        })
    }
}

/// Shared Vertex AI REST client.
pub struct VertexClient {
    http: Client,
    config: VertexConfig,
    token_cache: Arc<TokenCache>,
}

impl Clone for VertexClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            config: self.config.clone(),
            token_cache: Arc::clone(&self.token_cache),
        }
    }
}

impl VertexClient {
    /// Create a new client authenticated by the ambient service identity.
    pub async fn new(config: VertexConfig) -> VertexResult<Self> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| VertexError::auth_error(format!("No GCP credentials found: {}", e)))?;
        Ok(Self::with_token_cache(
            config,
            Arc::new(TokenCache::new(provider)),
        ))
    }

    /// Create a client with an explicit token cache (used by tests).
    pub fn with_token_cache(config: VertexConfig, token_cache: Arc<TokenCache>) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vsearch-vertex/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client with static config");

        Self {
            http,
            config,
            token_cache,
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> VertexResult<Self> {
        Self::new(VertexConfig::from_env()?).await
    }

    pub fn config(&self) -> &VertexConfig {
        &self.config
    }

    /// Predict URL for a published model.
    pub fn model_url(&self, model: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            self.config.api_base, self.config.project_id, self.config.region, model
        )
    }

    /// URL for an index verb (`upsertDatapoints`, `removeDatapoints`).
    pub fn index_url(&self, index_id: &str, verb: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/indexes/{}:{}",
            self.config.api_base, self.config.project_id, self.config.region, index_id, verb
        )
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// POST a JSON body with bearer auth, retry, and metrics.
    pub async fn post_json(
        &self,
        operation: &str,
        url: &str,
        body: &serde_json::Value,
    ) -> VertexResult<serde_json::Value> {
        with_retry(&self.config.retry, operation, || {
            self.post_once(operation, url, body)
        })
        .await
    }

    async fn post_once(
        &self,
        operation: &str,
        url: &str,
        body: &serde_json::Value,
    ) -> VertexResult<serde_json::Value> {
        let started = Instant::now();
        let mut token = self.token_cache.get_token().await?;
        let mut response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await?;
        let mut status = response.status();

        // An expired token gets one immediate refresh-and-resend.
        if status == StatusCode::UNAUTHORIZED {
            let text = response.text().await.unwrap_or_default();
            if Self::is_access_token_expired(&text) {
                self.token_cache.invalidate().await;
                token = self.token_cache.get_token().await?;
                response = self
                    .http
                    .post(url)
                    .bearer_auth(&token)
                    .json(body)
                    .send()
                    .await?;
                status = response.status();
            } else {
                record_request(operation, 401, started.elapsed().as_millis() as f64);
                return Err(VertexError::from_status(401, text));
            }
        }

        record_request(
            operation,
            status.as_u16(),
            started.elapsed().as_millis() as f64,
        );

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(VertexError::RateLimited(retry_after_ms));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(VertexError::from_status(status.as_u16(), text));
        }

        debug!(operation, url, "Vertex AI call succeeded");
        Ok(response.json().await?)
    }
}
