//! Shared data models for the VideoSearch backend.
//!
//! This crate provides Serde-serializable types for:
//! - Source videos and their fixed-length segments
//! - Embedding datapoints and index upsert results
//! - Ingestion pipeline stages and run reports

pub mod datapoint;
pub mod ingest;
pub mod segment;
pub mod video;

// Re-export common types
pub use datapoint::{DatapointId, DatapointIdError, EmbeddingRecord, UpsertResult, UpsertStatus};
pub use ingest::{IngestReport, IngestStage, JobId};
pub use segment::{segment_object_key, Segment, SegmentSpan};
pub use video::{SourceVideo, VideoId};
