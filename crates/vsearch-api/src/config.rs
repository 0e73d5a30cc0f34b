//! API configuration.

use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Bucket holding segment files, for playback links and readiness
    pub parts_bucket: String,
    /// Segment length in seconds, must match the worker
    pub segment_interval_secs: u32,
    /// Sub-interval length in seconds, must match the worker
    pub embed_interval_secs: u32,
    /// Default neighbor count for search
    pub default_neighbor_count: u32,
    /// Lifetime of presigned playback URLs
    pub play_url_ttl: Duration,
    /// Environment (development/production)
    pub environment: String,
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024),
            parts_bucket: std::env::var("PARTS_BUCKET").unwrap_or_default(),
            segment_interval_secs: std::env::var("SEGMENT_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
            embed_interval_secs: std::env::var("EMBED_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            default_neighbor_count: std::env::var("SEARCH_NEIGHBOR_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            play_url_ttl: Duration::from_secs(
                std::env::var("PLAY_URL_TTL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
