//! Multi-destination segment upload.
//!
//! Segments are replicated to every destination (the parts bucket, plus an
//! optional replica bucket in a second access-control domain so the
//! generative-language service can read the objects). Failures are
//! per-file: one failed upload never aborts its siblings.

use futures_util::future::join_all;
use tracing::warn;

use vsearch_models::Segment;

use crate::client::{gcs_uri, StorageClient};
use crate::error::{StorageError, StorageResult};

/// One upload target: a bucket plus an optional key prefix.
#[derive(Debug, Clone)]
pub struct UploadDestination {
    pub bucket: String,
    pub prefix: String,
}

impl UploadDestination {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: String::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Object key for a segment at this destination.
    pub fn key_for(&self, segment: &Segment) -> String {
        format!("{}{}", self.prefix, segment.object_key())
    }
}

/// Outcome of uploading one segment to one destination, positionally
/// aligned with the input segment list.
#[derive(Debug)]
pub struct UploadOutcome {
    /// Object key at the destination
    pub key: String,
    /// Destination bucket
    pub bucket: String,
    /// `gs://` location on success, error otherwise
    pub result: StorageResult<String>,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Build a failed outcome without attempting an upload, for
    /// destinations that are skipped outright.
    pub fn skipped(key: impl Into<String>, bucket: impl Into<String>, reason: &str) -> Self {
        Self {
            key: key.into(),
            bucket: bucket.into(),
            result: Err(StorageError::upload_failed(reason)),
        }
    }
}

/// Upload every segment to one destination.
///
/// Returns one outcome per segment in input order. Uploads run
/// concurrently; a failure is recorded in place and the rest proceed.
pub async fn upload_many(
    client: &StorageClient,
    segments: &[Segment],
    destination: &UploadDestination,
) -> Vec<UploadOutcome> {
    let uploads = segments.iter().map(|segment| {
        let key = destination.key_for(segment);
        let bucket = destination.bucket.clone();
        async move {
            let result = client
                .upload_file(&bucket, &key, &segment.path, "video/mp4")
                .await
                .map(|_| gcs_uri(&bucket, &key));

            if let Err(ref e) = result {
                warn!("Failed to upload {} to {}/{}: {}", segment.name, bucket, key, e);
            }

            UploadOutcome {
                key,
                bucket,
                result,
            }
        }
    });

    join_all(uploads).await
}

/// Count failed outcomes in a batch.
pub fn failure_count(outcomes: &[UploadOutcome]) -> usize {
    outcomes.iter().filter(|o| !o.is_success()).count()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use vsearch_models::{SegmentSpan, VideoId};

    use super::*;

    fn segment(index: usize) -> Segment {
        let span = SegmentSpan {
            index,
            start_sec: index as f64 * 120.0,
            end_sec: (index + 1) as f64 * 120.0,
        };
        Segment::new(
            &VideoId::from("v1"),
            span,
            PathBuf::from(format!("/tmp/v1-part-{}.mp4", index)),
        )
    }

    #[test]
    fn test_destination_key_includes_prefix() {
        let dest = UploadDestination::new("parts").with_prefix("ingest/");
        assert_eq!(dest.key_for(&segment(0)), "ingest/v1-part-0.mp4");

        let bare = UploadDestination::new("parts");
        assert_eq!(bare.key_for(&segment(3)), "v1-part-3.mp4");
    }

    #[test]
    fn test_failure_count() {
        let outcomes = vec![
            UploadOutcome {
                key: "a".into(),
                bucket: "b".into(),
                result: Ok("gs://b/a".into()),
            },
            UploadOutcome::skipped("c", "b", "no replica configured"),
        ];
        assert_eq!(failure_count(&outcomes), 1);
        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
    }
}
