//! Ingestion pipeline stages and run reports.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one queued job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stage of one ingestion run.
///
/// Stages advance strictly in order; `Failed` is reachable from any of
/// them and the report records the stage that was active when the run
/// stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Received,
    Downloading,
    Segmenting,
    Uploading,
    Embedding,
    Indexing,
    Done,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Received => "received",
            IngestStage::Downloading => "downloading",
            IngestStage::Segmenting => "segmenting",
            IngestStage::Uploading => "uploading",
            IngestStage::Embedding => "embedding",
            IngestStage::Indexing => "indexing",
            IngestStage::Done => "done",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregated outcome of one ingestion run.
///
/// There is no rollback of partially written state: a failed run reports
/// what it completed and leaves storage and the index as they are.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IngestReport {
    /// Video id the run ingested
    pub video_id: String,
    /// Stage reached when the run ended
    pub stage: IngestStage,
    /// Stage that was active when the run failed, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<IngestStage>,
    /// Error that stopped the run, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Segments produced by the segmenter
    pub segments_total: usize,
    /// Segments whose embedding or indexing step failed entirely
    pub segments_failed: usize,
    /// Upload failures across all destinations (per-file, non-fatal)
    pub upload_failures: usize,
    /// Datapoints successfully upserted into the index
    pub datapoints_upserted: usize,
    /// Per-datapoint upsert failures
    pub upsert_failures: usize,
    /// Best-effort archival writes that failed (never fatal)
    pub archival_failures: usize,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run ended
    pub finished_at: DateTime<Utc>,
}

impl IngestReport {
    /// Start a report for a new run.
    pub fn begin(video_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            video_id: video_id.into(),
            stage: IngestStage::Received,
            failed_stage: None,
            error: None,
            segments_total: 0,
            segments_failed: 0,
            upload_failures: 0,
            datapoints_upserted: 0,
            upsert_failures: 0,
            archival_failures: 0,
            started_at: now,
            finished_at: now,
        }
    }

    /// Advance to the next stage.
    pub fn enter(&mut self, stage: IngestStage) {
        self.stage = stage;
    }

    /// Mark the run as failed at the current stage.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.failed_stage = Some(self.stage);
        self.error = Some(error.into());
        self.finished_at = Utc::now();
    }

    /// Mark the run as completed.
    pub fn complete(&mut self) {
        self.stage = IngestStage::Done;
        self.finished_at = Utc::now();
    }

    pub fn is_failed(&self) -> bool {
        self.failed_stage.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serde_names() {
        assert_eq!(
            serde_json::to_string(&IngestStage::Embedding).unwrap(),
            "\"embedding\""
        );
        let stage: IngestStage = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(stage, IngestStage::Done);
    }

    #[test]
    fn test_report_failure_records_active_stage() {
        let mut report = IngestReport::begin("v1");
        report.enter(IngestStage::Downloading);
        report.enter(IngestStage::Segmenting);
        report.fail("unreadable source");
        assert!(report.is_failed());
        assert_eq!(report.failed_stage, Some(IngestStage::Segmenting));
        assert_eq!(report.stage, IngestStage::Segmenting);
    }

    #[test]
    fn test_report_complete() {
        let mut report = IngestReport::begin("v1");
        report.enter(IngestStage::Indexing);
        report.complete();
        assert!(!report.is_failed());
        assert_eq!(report.stage, IngestStage::Done);
    }
}
