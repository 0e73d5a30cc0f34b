//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vsearch_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vsearch_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vsearch_http_requests_in_flight";

    // Queue metrics
    pub const QUEUE_LENGTH: &str = "vsearch_queue_length";
    pub const QUEUE_DLQ_LENGTH: &str = "vsearch_queue_dlq_length";
    pub const JOBS_ENQUEUED_TOTAL: &str = "vsearch_jobs_enqueued_total";

    // Search metrics
    pub const SEARCHES_TOTAL: &str = "vsearch_searches_total";
    pub const SEARCH_DURATION_SECONDS: &str = "vsearch_search_duration_seconds";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record job enqueued.
pub fn record_job_enqueued(job_type: &str) {
    let labels = [("type", job_type.to_string())];
    counter!(names::JOBS_ENQUEUED_TOTAL, &labels).increment(1);
}

/// Update queue length gauge.
pub fn set_queue_length(length: u64) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}

/// Update DLQ length gauge.
pub fn set_dlq_length(length: u64) {
    gauge!(names::QUEUE_DLQ_LENGTH).set(length as f64);
}

/// Record a search request.
pub fn record_search(duration_secs: f64) {
    counter!(names::SEARCHES_TOTAL).increment(1);
    histogram!(names::SEARCH_DURATION_SECONDS).record(duration_secs);
}

/// Sanitize path for metrics labels (remove IDs, etc.).
fn sanitize_path(path: &str) -> String {
    // Normalize video IDs and job IDs before the generic UUID rule
    let path = regex_lite::Regex::new(r"/videos/[a-zA-Z0-9_.-]+")
        .expect("valid regex")
        .replace_all(path, "/videos/:video_id");
    let path = regex_lite::Regex::new(r"/jobs/[a-zA-Z0-9_.-]+")
        .expect("valid regex")
        .replace_all(&path, "/jobs/:job_id");
    let path = regex_lite::Regex::new(
        r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
    )
    .expect("valid regex")
    .replace_all(&path, ":id");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
