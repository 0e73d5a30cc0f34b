//! Redis Streams job queue.
//!
//! This crate provides:
//! - Job enqueueing with in-flight deduplication by `(bucket, name)`
//! - Worker consumption with retry counts, DLQ, and pending-claim
//!   crash recovery
//! - Per-job stage records so the ack path never waits on execution

pub mod error;
pub mod job;
pub mod queue;
pub mod status;

pub use error::{QueueError, QueueResult};
pub use job::{DeleteVideoJob, IngestVideoJob, QueueJob};
pub use queue::{JobQueue, QueueConfig};
pub use status::JobStatusStore;
