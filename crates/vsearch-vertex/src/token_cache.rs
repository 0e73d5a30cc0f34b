//! Bearer token caching for Vertex AI authentication.
//!
//! Tokens come from the ambient service identity and are cached with a
//! refresh margin so one batch of external calls never straddles an
//! expiry. Refresh uses the single-flight pattern to stop concurrent
//! segment workers from stampeding the metadata server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{VertexError, VertexResult};

/// Refresh margin: refresh token 60 seconds before expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Conservative token TTL when expiry is unknown (50 minutes).
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

/// OAuth scope for Vertex AI access.
pub const VERTEX_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Cached token with expiration tracking.
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Where tokens come from.
enum TokenSource {
    /// Ambient GCP service identity.
    Provider(Arc<dyn TokenProvider>),
    /// Fixed token, for tests against a mock server.
    Static(String),
}

/// Thread-safe token cache with single-flight refresh.
pub struct TokenCache {
    source: TokenSource,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    /// Create a new token cache backed by a GCP token provider.
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            source: TokenSource::Provider(provider),
            cache: RwLock::new(None),
        }
    }

    /// Create a cache that always hands out a fixed token.
    pub fn with_static_token(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Static(token.into()),
            cache: RwLock::new(None),
        }
    }

    /// Invalidate the cached token.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_token(&self) -> VertexResult<String> {
        if let TokenSource::Static(token) = &self.source {
            return Ok(token.clone());
        }

        // Fast path: check read lock first
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        // Slow path: acquire write lock and refresh
        let mut cache = self.cache.write().await;

        // Double-check: another task may have refreshed while we waited
        if let Some(cached) = cache.as_ref() {
            if cached.is_valid() {
                return Ok(cached.access_token.clone());
            }
        }

        self.refresh_token(&mut cache).await
    }

    async fn refresh_token(&self, cache: &mut Option<CachedToken>) -> VertexResult<String> {
        let provider = match &self.source {
            TokenSource::Provider(p) => p,
            TokenSource::Static(token) => return Ok(token.clone()),
        };

        match provider.token(&[VERTEX_SCOPE]).await {
            Ok(token) => {
                let access_token = token.as_str().to_string();

                // Prefer the real expiry, fall back to a conservative default.
                let expires_at = {
                    let now = Utc::now();
                    let exp = token.expires_at();

                    if exp > now {
                        match (exp - now).to_std() {
                            Ok(ttl) => Instant::now() + ttl,
                            Err(_) => Instant::now() + TOKEN_DEFAULT_TTL,
                        }
                    } else {
                        // An already-expired token forces refresh on the next call.
                        Instant::now()
                    }
                };

                *cache = Some(CachedToken {
                    access_token: access_token.clone(),
                    expires_at,
                });

                debug!("Refreshed Vertex AI auth token");
                Ok(access_token)
            }
            Err(e) => {
                // Fall back to the existing token if it is still usable.
                if let Some(cached) = cache.as_ref() {
                    if cached.is_usable() {
                        warn!("Token refresh failed, reusing token close to expiry: {}", e);
                        return Ok(cached.access_token.clone());
                    }
                }
                Err(VertexError::auth_error(format!(
                    "Failed to refresh access token: {}",
                    e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let cache = TokenCache::with_static_token("test-token");
        assert_eq!(cache.get_token().await.unwrap(), "test-token");
        cache.invalidate().await;
        assert_eq!(cache.get_token().await.unwrap(), "test-token");
    }
}
