//! Vertex AI REST clients.
//!
//! This crate talks to two managed services through their REST APIs:
//! - The multimodal embedding model (`:predict`), which returns one
//!   vector per fixed sub-interval of a video segment
//! - Vector Search (`:upsertDatapoints` / `:removeDatapoints` on the
//!   index, `:findNeighbors` on the deployed index endpoint)
//!
//! Both are reached with short-lived bearer tokens from the ambient
//! service identity, cached with a refresh margin, and every call is
//! retried with exponential backoff on transient failures.

pub mod client;
pub mod embedding;
pub mod error;
pub mod index;
pub mod matcher;
pub mod metrics;
pub mod retry;
pub mod token_cache;

pub use client::{VertexClient, VertexConfig};
pub use embedding::{EmbeddingClient, VideoEmbedding};
pub use error::{VertexError, VertexResult};
pub use index::IndexClient;
pub use matcher::{MatchClient, Neighbor};
pub use retry::RetryConfig;
pub use token_cache::TokenCache;
