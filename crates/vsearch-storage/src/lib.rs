//! S3-compatible object storage client.
//!
//! This crate provides:
//! - Object upload/download/list/delete against the GCS interoperability
//!   endpoint (any S3-compatible store works, e.g. MinIO in tests)
//! - Multi-destination segment upload with per-file results
//! - Best-effort archival JSON writes
//! - Presigned GET URLs for playback links

pub mod client;
pub mod error;
pub mod uploader;

pub use client::{gcs_uri, ObjectInfo, StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use uploader::{failure_count, upload_many, UploadDestination, UploadOutcome};
