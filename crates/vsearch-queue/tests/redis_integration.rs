//! Redis/Queue integration tests.

use vsearch_queue::{IngestVideoJob, JobQueue, QueueJob};

/// Test Redis connection and basic operations.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_redis_connection() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let len = queue.len().await.expect("Failed to get queue length");
    println!("Queue length: {}", len);
}

/// Test job enqueue and dequeue cycle.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_job_enqueue_dequeue() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let job = IngestVideoJob::new("test-bucket", "integration/test.mp4");
    let job_id = job.job_id.clone();

    let message_id = queue.enqueue_ingest(job).await.expect("Failed to enqueue");
    println!("Enqueued job {} with message ID {}", job_id, message_id);

    let jobs = queue
        .consume("test-consumer", 1000, 1)
        .await
        .expect("Failed to consume");

    assert_eq!(jobs.len(), 1);
    let (msg_id, consumed_job) = &jobs[0];
    assert_eq!(consumed_job.job_id(), &job_id);

    queue.ack(msg_id).await.expect("Failed to ack");
    queue
        .clear_dedup(consumed_job)
        .await
        .expect("Failed to clear dedup");
    println!("Job {} acknowledged", job_id);
}

/// A second notification for the same object must be rejected while the
/// first is in flight, then accepted again once its dedup key clears.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_duplicate_rejection() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let first = IngestVideoJob::new("test-bucket", "integration/dup.mp4");
    queue.enqueue_ingest(first.clone()).await.expect("Failed to enqueue");

    let second = IngestVideoJob::new("test-bucket", "integration/dup.mp4");
    let err = queue
        .enqueue_ingest(second)
        .await
        .expect_err("Duplicate should be rejected");
    assert!(err.is_duplicate());

    // Release the key and try again
    queue
        .clear_dedup(&QueueJob::IngestVideo(first))
        .await
        .expect("Failed to clear dedup");
    let third = IngestVideoJob::new("test-bucket", "integration/dup.mp4");
    queue.enqueue_ingest(third).await.expect("Re-enqueue after clear");
}

/// Test DLQ functionality.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_dlq() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let job = IngestVideoJob::new("test-bucket", "integration/dlq.mp4");
    let message_id = queue
        .enqueue_ingest(job.clone())
        .await
        .expect("Failed to enqueue");

    let before = queue.dlq_len().await.expect("Failed to get DLQ length");

    queue
        .dlq(&message_id, &QueueJob::IngestVideo(job), "simulated failure")
        .await
        .expect("Failed to move to DLQ");

    let after = queue.dlq_len().await.expect("Failed to get DLQ length");
    assert_eq!(after, before + 1);
}
