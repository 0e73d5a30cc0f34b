//! Video deletion.
//!
//! Removal works backwards from the archive: the archival records name
//! every datapoint id that was ever upserted for a video, so listing
//! them reconstructs the exact set to remove from the index without
//! re-deriving segment counts.

use tracing::{info, warn};

use vsearch_models::{DatapointId, VideoId};
use vsearch_queue::DeleteVideoJob;

use crate::error::WorkerResult;
use crate::pipeline::WorkerContext;

/// Outcome of one delete run.
#[derive(Debug, Default)]
pub struct DeleteOutcome {
    /// Datapoints removed from the index
    pub datapoints_removed: usize,
    /// Objects deleted across archive and parts buckets
    pub objects_deleted: u32,
}

/// Remove a video's datapoints, archival records, and segment parts.
pub async fn run_delete(ctx: &WorkerContext, job: &DeleteVideoJob) -> WorkerResult<DeleteOutcome> {
    let video_id = &job.video_id;
    let prefix = video_id.segment_prefix();
    let mut outcome = DeleteOutcome::default();

    info!("Deleting video '{}'", video_id);

    // Archive listing is the source of truth for what was indexed.
    let archive_objects = ctx
        .storage
        .list_objects(&ctx.config.archive_bucket, &prefix)
        .await?;

    let ids: Vec<DatapointId> = archive_objects
        .iter()
        .filter_map(|obj| datapoint_id_from_archive_key(&obj.key, video_id))
        .collect();

    if !ids.is_empty() {
        ctx.index.remove(&ids).await?;
        outcome.datapoints_removed = ids.len();
    }

    let archive_keys: Vec<String> = archive_objects.into_iter().map(|o| o.key).collect();
    if !archive_keys.is_empty() {
        outcome.objects_deleted += ctx
            .storage
            .delete_objects(&ctx.config.archive_bucket, &archive_keys)
            .await?;
    }

    let part_keys: Vec<String> = ctx
        .storage
        .list_objects(&ctx.config.parts_bucket, &prefix)
        .await?
        .into_iter()
        .map(|o| o.key)
        .collect();
    if !part_keys.is_empty() {
        outcome.objects_deleted += ctx
            .storage
            .delete_objects(&ctx.config.parts_bucket, &part_keys)
            .await?;
    }

    if let Some(replica_bucket) = &ctx.config.replica_bucket {
        match ctx.storage.list_objects(replica_bucket, &prefix).await {
            Ok(objects) => {
                let keys: Vec<String> = objects.into_iter().map(|o| o.key).collect();
                if !keys.is_empty() {
                    match ctx.storage.delete_objects(replica_bucket, &keys).await {
                        Ok(n) => outcome.objects_deleted += n,
                        Err(e) => warn!("Replica delete failed for '{}': {}", video_id, e),
                    }
                }
            }
            Err(e) => warn!("Replica listing failed for '{}': {}", video_id, e),
        }
    }

    info!(
        "Deleted video '{}': {} datapoints, {} objects",
        video_id, outcome.datapoints_removed, outcome.objects_deleted
    );
    Ok(outcome)
}

/// Recover a datapoint id from an archival object key.
///
/// Keys look like `myvideo-part-3_2.json`. Keys under the prefix that
/// do not parse as a datapoint id of this video are skipped, which
/// guards against a video id that is a prefix of another (`v1` vs
/// `v10`).
fn datapoint_id_from_archive_key(key: &str, video_id: &VideoId) -> Option<DatapointId> {
    let stem = key.strip_suffix(".json")?;
    let id = DatapointId(stem.to_string());
    if !id.belongs_to(video_id) || id.parse().is_err() {
        return None;
    }
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_archive_keys() {
        let video = VideoId::from_string("myvideo");
        let id = datapoint_id_from_archive_key("myvideo-part-3_2.json", &video);
        assert_eq!(id.map(|i| i.as_str().to_string()).as_deref(), Some("myvideo-part-3_2"));
    }

    #[test]
    fn rejects_foreign_and_malformed_keys() {
        let video = VideoId::from_string("v1");
        // Different video whose id shares the prefix
        assert!(datapoint_id_from_archive_key("v10-part-0_1.json", &video).is_none());
        // Not an archival record
        assert!(datapoint_id_from_archive_key("v1-part-0_1.txt", &video).is_none());
        // No sub-interval suffix
        assert!(datapoint_id_from_archive_key("v1-part-0.json", &video).is_none());
    }
}
