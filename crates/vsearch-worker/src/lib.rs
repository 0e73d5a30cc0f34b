//! Video ingestion worker.
//!
//! This crate provides:
//! - Job executor for ingest/delete jobs
//! - The ingestion pipeline (download, segment, upload, embed, index)
//! - Video deletion driven by archival records
//! - Graceful shutdown

pub mod config;
pub mod delete;
pub mod error;
pub mod executor;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use pipeline::WorkerContext;
