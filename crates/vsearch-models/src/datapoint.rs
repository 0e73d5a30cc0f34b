//! Embedding datapoint models.
//!
//! A datapoint id encodes which segment a vector came from and which
//! sub-interval inside that segment it covers:
//! `{video_id}-part-{segment_index}_{sub_interval_index}`, with the
//! sub-interval index 1-based in embedding-response order. Search results
//! reverse this mapping to recover a playable timestamp.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::video::VideoId;

/// Errors from parsing a datapoint id.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatapointIdError {
    #[error("Missing sub-interval suffix in datapoint id: {0}")]
    MissingSubInterval(String),

    #[error("Invalid sub-interval index in datapoint id: {0}")]
    InvalidSubInterval(String),
}

/// Identifier of one embedding vector in the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DatapointId(pub String);

impl DatapointId {
    /// Build an id for a sub-interval of a segment.
    ///
    /// `sub_interval_index` is 1-based, matching the order of vectors in
    /// the embedding service response.
    pub fn new(segment_name: &str, sub_interval_index: usize) -> Self {
        Self(format!("{}_{}", segment_name, sub_interval_index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the id back into segment name and sub-interval index.
    pub fn parse(&self) -> Result<(String, usize), DatapointIdError> {
        let (segment, sub) = self
            .0
            .rsplit_once('_')
            .ok_or_else(|| DatapointIdError::MissingSubInterval(self.0.clone()))?;
        let index: usize = sub
            .parse()
            .map_err(|_| DatapointIdError::InvalidSubInterval(self.0.clone()))?;
        if index == 0 {
            return Err(DatapointIdError::InvalidSubInterval(self.0.clone()));
        }
        Ok((segment.to_string(), index))
    }

    /// Start offset of this sub-interval within its segment, in seconds.
    pub fn start_sec(&self, interval_sec: u32) -> Result<f64, DatapointIdError> {
        let (_, index) = self.parse()?;
        Ok(((index - 1) as u32 * interval_sec) as f64)
    }

    /// Object key of the archival JSON copy of this datapoint.
    pub fn archive_key(&self) -> String {
        format!("{}.json", self.0)
    }

    /// True if this datapoint belongs to the given video.
    pub fn belongs_to(&self, video_id: &VideoId) -> bool {
        self.0.starts_with(&video_id.segment_prefix())
    }
}

impl fmt::Display for DatapointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DatapointId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One embedding vector plus its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Datapoint id, globally unique per sub-interval
    pub id: DatapointId,
    /// Opaque fixed-dimension feature vector
    pub vector: Vec<f32>,
    /// Segment object name this vector was computed from
    pub segment_name: String,
    /// 1-based sub-interval index within the segment
    pub sub_interval_index: usize,
}

impl EmbeddingRecord {
    pub fn new(segment_name: impl Into<String>, sub_interval_index: usize, vector: Vec<f32>) -> Self {
        let segment_name = segment_name.into();
        Self {
            id: DatapointId::new(&segment_name, sub_interval_index),
            vector,
            segment_name,
            sub_interval_index,
        }
    }

    /// Archival JSON body, `{id, embedding}`, stored at `{id}.json`.
    pub fn archive_body(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.as_str(),
            "embedding": self.vector,
        })
    }
}

/// Outcome of upserting one datapoint into the vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UpsertStatus {
    Success,
    Error,
}

/// Result of writing one embedding record to the index.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpsertResult {
    pub id: DatapointId,
    pub status: UpsertStatus,
    /// Error detail when status is `Error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpsertResult {
    pub fn success(id: DatapointId) -> Self {
        Self {
            id,
            status: UpsertStatus::Success,
            error: None,
        }
    }

    pub fn error(id: DatapointId, detail: impl Into<String>) -> Self {
        Self {
            id,
            status: UpsertStatus::Error,
            error: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == UpsertStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datapoint_id_format() {
        let id = DatapointId::new("v1-part-0", 1);
        assert_eq!(id.as_str(), "v1-part-0_1");
        assert_eq!(id.archive_key(), "v1-part-0_1.json");
    }

    #[test]
    fn test_two_sub_intervals_yield_distinct_ids() {
        // An embedding response with 2 sub-intervals for segment v1-part-0
        // produces ids v1-part-0_1 and v1-part-0_2.
        let first = EmbeddingRecord::new("v1-part-0", 1, vec![0.1]);
        let second = EmbeddingRecord::new("v1-part-0", 2, vec![0.2]);
        assert_eq!(first.id.as_str(), "v1-part-0_1");
        assert_eq!(second.id.as_str(), "v1-part-0_2");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_parse_round_trip() {
        let id = DatapointId::new("chicago-part-3", 7);
        let (segment, sub) = id.parse().unwrap();
        assert_eq!(segment, "chicago-part-3");
        assert_eq!(sub, 7);
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        assert!(matches!(
            DatapointId::from("no-separator".to_string()).parse(),
            Err(DatapointIdError::MissingSubInterval(_))
        ));
        assert!(matches!(
            DatapointId::from("v1-part-0_x".to_string()).parse(),
            Err(DatapointIdError::InvalidSubInterval(_))
        ));
        assert!(matches!(
            DatapointId::from("v1-part-0_0".to_string()).parse(),
            Err(DatapointIdError::InvalidSubInterval(_))
        ));
    }

    #[test]
    fn test_start_sec_uses_one_based_index() {
        // Sub-interval 1 starts at 0s, sub-interval 3 at 10s with 5s intervals.
        let id = DatapointId::new("v1-part-0", 3);
        assert_eq!(id.start_sec(5).unwrap(), 10.0);
        assert_eq!(DatapointId::new("v1-part-0", 1).start_sec(5).unwrap(), 0.0);
    }

    #[test]
    fn test_belongs_to_is_prefix_scoped() {
        let v1 = VideoId::from("v1");
        let v10 = VideoId::from("v10");
        let id = DatapointId::new("v1-part-0", 1);
        assert!(id.belongs_to(&v1));
        assert!(!id.belongs_to(&v10));
        // "v10-part-0_1" must not match video "v1"
        assert!(!DatapointId::new("v10-part-0", 1).belongs_to(&v1));
    }

    #[test]
    fn test_archive_body_shape() {
        let record = EmbeddingRecord::new("v1-part-0", 1, vec![0.5, 0.25]);
        let body = record.archive_body();
        assert_eq!(body["id"], "v1-part-0_1");
        assert_eq!(body["embedding"].as_array().unwrap().len(), 2);
    }
}
