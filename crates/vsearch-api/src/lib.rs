//! Axum HTTP API server.
//!
//! This crate provides:
//! - The storage-change notification endpoint (fast ack, queue-backed)
//! - Text search over indexed video segments
//! - Video deletion and job status endpoints
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
