//! Ingestion pipeline orchestration.
//!
//! One run moves a video through download, segmentation, segment
//! upload, embedding, and index upsert, accumulating an [`IngestReport`]
//! that is persisted after every stage transition.

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use vsearch_media::split_video;
use vsearch_models::{
    DatapointId, EmbeddingRecord, IngestReport, IngestStage, Segment, UpsertResult,
};
use vsearch_queue::{IngestVideoJob, JobStatusStore};
use vsearch_storage::{failure_count, gcs_uri, upload_many, StorageClient, UploadDestination};
use vsearch_vertex::{EmbeddingClient, IndexClient, VertexClient, VideoEmbedding};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Shared clients and limits for job execution.
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub storage: StorageClient,
    pub status: JobStatusStore,
    pub embedding: EmbeddingClient,
    pub index: IndexClient,
    pub segment_semaphore: Arc<Semaphore>,
}

impl WorkerContext {
    /// Create a new worker context from the environment.
    pub async fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let storage = StorageClient::from_env()?;

        let vertex = VertexClient::from_env().await?;
        let embedding = EmbeddingClient::new(vertex.clone());
        let index = IndexClient::from_env(vertex)?;

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let status = JobStatusStore::new(&redis_url)?;

        let segment_semaphore = Arc::new(Semaphore::new(config.max_segment_parallel));

        Ok(Self {
            config,
            storage,
            status,
            embedding,
            index,
            segment_semaphore,
        })
    }
}

/// Outcome of embedding and indexing one segment.
#[derive(Debug, Default)]
struct SegmentOutcome {
    /// The segment produced no datapoints at all
    failed: bool,
    upserted: usize,
    upsert_failures: usize,
    archival_failures: usize,
}

/// Run the full ingestion pipeline for one job.
///
/// The report is written to the status store at every stage boundary so
/// an observer sees where a run is, not just whether it finished.
pub async fn run_ingest(ctx: &WorkerContext, job: &IngestVideoJob) -> WorkerResult<IngestReport> {
    let video_id = job.video_id();
    let mut report = IngestReport::begin(video_id.as_str());
    record_status(ctx, job, &report).await;

    info!(
        "Ingesting gs://{}/{} as video '{}'",
        job.video.bucket, job.video.name, video_id
    );

    match ingest_stages(ctx, job, &mut report).await {
        Ok(()) => {
            report.complete();
            record_status(ctx, job, &report).await;
            info!(
                "Ingestion of '{}' done: {} segments, {} datapoints upserted ({} upsert failures, {} segment failures)",
                report.video_id,
                report.segments_total,
                report.datapoints_upserted,
                report.upsert_failures,
                report.segments_failed,
            );
            metrics::counter!("ingest_jobs_total", "outcome" => "ok").increment(1);
            Ok(report)
        }
        Err(e) => {
            report.fail(e.to_string());
            record_status(ctx, job, &report).await;
            metrics::counter!("ingest_jobs_total", "outcome" => "error").increment(1);
            Err(e)
        }
    }
}

async fn ingest_stages(
    ctx: &WorkerContext,
    job: &IngestVideoJob,
    report: &mut IngestReport,
) -> WorkerResult<()> {
    let video_id = job.video_id();

    tokio::fs::create_dir_all(&ctx.config.work_dir).await?;
    let work_dir = tempfile::Builder::new()
        .prefix(video_id.as_str())
        .tempdir_in(&ctx.config.work_dir)?;

    // Download
    report.enter(IngestStage::Downloading);
    record_status(ctx, job, report).await;

    let source_path: PathBuf = work_dir.path().join("source.mp4");
    ctx.storage
        .download_file(&job.video.bucket, &job.video.name, &source_path)
        .await?;

    // Segment
    report.enter(IngestStage::Segmenting);
    record_status(ctx, job, report).await;

    let segments = split_video(
        &source_path,
        &video_id,
        ctx.config.segment_interval_secs,
        work_dir.path(),
    )
    .await?;
    report.segments_total = segments.len();

    if segments.is_empty() {
        warn!("Video '{}' produced no segments", video_id);
        return Ok(());
    }

    // Upload
    report.enter(IngestStage::Uploading);
    record_status(ctx, job, report).await;

    let parts = UploadDestination::new(&ctx.config.parts_bucket);
    let part_outcomes = upload_many(&ctx.storage, &segments, &parts).await;
    report.upload_failures += failure_count(&part_outcomes);

    if let Some(replica_bucket) = &ctx.config.replica_bucket {
        let replica = UploadDestination::new(replica_bucket);
        let replica_outcomes = upload_many(&ctx.storage, &segments, &replica).await;
        report.upload_failures += failure_count(&replica_outcomes);
    }

    // A segment whose primary upload failed has nothing to embed from.
    let uploaded: Vec<&Segment> = segments
        .iter()
        .zip(part_outcomes.iter())
        .filter_map(|(segment, outcome)| outcome.is_success().then_some(segment))
        .collect();
    report.segments_failed += segments.len() - uploaded.len();

    // Embed
    report.enter(IngestStage::Embedding);
    record_status(ctx, job, report).await;

    let embedded = embed_segments(ctx, &uploaded).await;

    // Index
    report.enter(IngestStage::Indexing);
    record_status(ctx, job, report).await;

    let outcomes = index_segments(ctx, &embedded).await;
    fold_outcomes(report, &outcomes);

    Ok(())
}

/// Request embeddings for every uploaded segment, bounded by the
/// per-job segment semaphore. Failures are recorded in place.
async fn embed_segments<'a>(
    ctx: &WorkerContext,
    uploaded: &[&'a Segment],
) -> Vec<(&'a Segment, Option<Vec<VideoEmbedding>>)> {
    let tasks = uploaded.iter().map(|segment| {
        let semaphore = Arc::clone(&ctx.segment_semaphore);
        async move {
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Segment pool closed before '{}' was embedded", segment.name);
                    return (*segment, None);
                }
            };
            let uri = gcs_uri(&ctx.config.parts_bucket, &segment.object_key());
            match ctx
                .embedding
                .embed_video(&uri, ctx.config.embed_interval_secs)
                .await
            {
                Ok(embeddings) => (*segment, Some(embeddings)),
                Err(e) => {
                    warn!("Embedding failed for segment '{}': {}", segment.name, e);
                    (*segment, None)
                }
            }
        }
    });

    join_all(tasks).await
}

/// Archive and upsert every datapoint of every embedded segment.
async fn index_segments(
    ctx: &WorkerContext,
    embedded: &[(&Segment, Option<Vec<VideoEmbedding>>)],
) -> Vec<SegmentOutcome> {
    let tasks = embedded.iter().map(|(segment, embeddings)| {
        let semaphore = Arc::clone(&ctx.segment_semaphore);
        async move {
            let Some(embeddings) = embeddings else {
                return SegmentOutcome {
                    failed: true,
                    ..Default::default()
                };
            };

            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Segment pool closed before '{}' was indexed", segment.name);
                    return SegmentOutcome {
                        failed: true,
                        ..Default::default()
                    };
                }
            };
            let mut outcome = SegmentOutcome::default();

            for embedding in embeddings {
                let record = EmbeddingRecord::new(
                    segment.name.clone(),
                    embedding.sub_interval_index,
                    embedding.vector.clone(),
                );
                let id = DatapointId::new(&segment.name, embedding.sub_interval_index);

                // Archival is best effort and never blocks the upsert.
                if let Err(e) = ctx
                    .storage
                    .put_json(&ctx.config.archive_bucket, &id.archive_key(), &record.archive_body())
                    .await
                {
                    warn!("Archival write failed for '{}': {}", id.as_str(), e);
                    outcome.archival_failures += 1;
                }

                let result = ctx.index.upsert(&id, &embedding.vector).await;
                tally_upsert(&mut outcome, &result);
            }

            if outcome.upserted == 0 {
                outcome.failed = true;
            }
            outcome
        }
    });

    join_all(tasks).await
}

fn tally_upsert(outcome: &mut SegmentOutcome, result: &UpsertResult) {
    if result.is_success() {
        outcome.upserted += 1;
        metrics::counter!("index_upserts_total", "outcome" => "ok").increment(1);
    } else {
        warn!(
            "Upsert failed for '{}': {}",
            result.id.as_str(),
            result.error.as_deref().unwrap_or("unknown")
        );
        outcome.upsert_failures += 1;
        metrics::counter!("index_upserts_total", "outcome" => "error").increment(1);
    }
}

fn fold_outcomes(report: &mut IngestReport, outcomes: &[SegmentOutcome]) {
    for outcome in outcomes {
        if outcome.failed {
            report.segments_failed += 1;
        }
        report.datapoints_upserted += outcome.upserted;
        report.upsert_failures += outcome.upsert_failures;
        report.archival_failures += outcome.archival_failures;
    }
}

async fn record_status(ctx: &WorkerContext, job: &IngestVideoJob, report: &IngestReport) {
    if let Err(e) = ctx.status.record(&job.job_id, report).await {
        warn!("Failed to record job status for {}: {}", job.job_id, e);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use vsearch_models::{SegmentSpan, VideoId};
    use vsearch_storage::StorageConfig;
    use vsearch_vertex::{RetryConfig, TokenCache, VertexConfig};

    use super::*;

    fn offline_context(parallel: usize) -> WorkerContext {
        let config = WorkerConfig {
            max_concurrent_jobs: 1,
            max_segment_parallel: parallel,
            segment_interval_secs: 120,
            embed_interval_secs: 5,
            parts_bucket: "parts".to_string(),
            replica_bucket: None,
            archive_bucket: "archive".to_string(),
            work_dir: "/tmp/vsearch-test".to_string(),
            shutdown_timeout: Duration::from_secs(1),
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(300),
        };
        let storage = StorageClient::new(StorageConfig {
            endpoint_url: "http://127.0.0.1:1".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            region: "auto".to_string(),
        });
        let vertex = VertexClient::with_token_cache(
            VertexConfig {
                project_id: "test-project".to_string(),
                region: "us-central1".to_string(),
                api_base: "http://127.0.0.1:1".to_string(),
                timeout: Duration::from_millis(100),
                connect_timeout: Duration::from_millis(100),
                retry: RetryConfig::none(),
            },
            Arc::new(TokenCache::with_static_token("t0k3n")),
        );
        let embedding = EmbeddingClient::new(vertex.clone());
        let index = IndexClient::new(vertex, "idx-1");
        let status = JobStatusStore::new("redis://127.0.0.1:1").unwrap();

        WorkerContext {
            config,
            storage,
            status,
            embedding,
            index,
            segment_semaphore: Arc::new(Semaphore::new(parallel)),
        }
    }

    fn segment() -> Segment {
        Segment::new(
            &VideoId::from("v1"),
            SegmentSpan {
                index: 0,
                start_sec: 0.0,
                end_sec: 120.0,
            },
            PathBuf::from("/tmp/v1-part-0.mp4"),
        )
    }

    #[tokio::test]
    async fn closed_segment_pool_fails_embedding_instead_of_proceeding() {
        let ctx = offline_context(2);
        ctx.segment_semaphore.close();

        let seg = segment();
        let embedded = embed_segments(&ctx, &[&seg]).await;
        assert_eq!(embedded.len(), 1);
        assert!(embedded[0].1.is_none());
    }

    #[tokio::test]
    async fn closed_segment_pool_fails_indexing_instead_of_proceeding() {
        let ctx = offline_context(2);
        ctx.segment_semaphore.close();

        let seg = segment();
        let embedded = vec![(
            &seg,
            Some(vec![VideoEmbedding {
                sub_interval_index: 1,
                vector: vec![0.1, 0.2],
                start_offset_sec: Some(0.0),
                end_offset_sec: Some(5.0),
            }]),
        )];
        let outcomes = index_segments(&ctx, &embedded).await;
        assert!(outcomes[0].failed);
        assert_eq!(outcomes[0].upserted, 0);
    }

    fn outcome(
        failed: bool,
        upserted: usize,
        upsert_failures: usize,
        archival_failures: usize,
    ) -> SegmentOutcome {
        SegmentOutcome {
            failed,
            upserted,
            upsert_failures,
            archival_failures,
        }
    }

    #[test]
    fn fold_outcomes_aggregates_counts() {
        let mut report = IngestReport::begin("video1");
        report.segments_total = 3;

        let outcomes = vec![
            outcome(false, 24, 0, 0),
            outcome(false, 22, 2, 1),
            outcome(true, 0, 0, 0),
        ];
        fold_outcomes(&mut report, &outcomes);

        assert_eq!(report.datapoints_upserted, 46);
        assert_eq!(report.upsert_failures, 2);
        assert_eq!(report.archival_failures, 1);
        assert_eq!(report.segments_failed, 1);
    }

    #[test]
    fn tally_counts_successes_and_failures() {
        let mut o = SegmentOutcome::default();
        let id = DatapointId::new("video1-part-0", 1);

        tally_upsert(&mut o, &UpsertResult::success(id.clone()));
        tally_upsert(&mut o, &UpsertResult::error(id, "boom"));

        assert_eq!(o.upserted, 1);
        assert_eq!(o.upsert_failures, 1);
    }

    #[test]
    fn segment_with_no_upserts_is_failed() {
        // Mirrors the end of index_segments: a segment that produced
        // embeddings but upserted nothing still counts as failed.
        let mut o = SegmentOutcome::default();
        let id = DatapointId::new("video1-part-0", 1);
        tally_upsert(&mut o, &UpsertResult::error(id, "quota"));
        if o.upserted == 0 {
            o.failed = true;
        }
        assert!(o.failed);
    }
}
