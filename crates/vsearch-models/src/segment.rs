//! Video segment models.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::video::VideoId;

/// A half-open `[start, end)` time range within a source video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentSpan {
    /// Segment index, 0-based
    pub index: usize,
    /// Start offset in seconds (inclusive)
    pub start_sec: f64,
    /// End offset in seconds (exclusive)
    pub end_sec: f64,
}

impl SegmentSpan {
    /// Length of the span in seconds.
    pub fn duration(&self) -> f64 {
        self.end_sec - self.start_sec
    }
}

/// A segment cut from a source video.
///
/// The local file is transient: it exists only for the lifetime of one
/// pipeline run and is removed once uploads complete.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Time range within the source video
    pub span: SegmentSpan,
    /// Object name, `{video_id}-part-{index}`
    pub name: String,
    /// Local file produced by the segmenter
    pub path: PathBuf,
}

impl Segment {
    pub fn new(video_id: &VideoId, span: SegmentSpan, path: PathBuf) -> Self {
        Self {
            name: video_id.segment_name(span.index),
            span,
            path,
        }
    }

    /// Segment index within the source video.
    pub fn index(&self) -> usize {
        self.span.index
    }

    /// Object key of the uploaded segment file.
    pub fn object_key(&self) -> String {
        format!("{}.mp4", self.name)
    }
}

/// Object key of a segment given its name, for callers that only have
/// a datapoint id to work from.
pub fn segment_object_key(segment_name: &str) -> String {
    format!("{}.mp4", segment_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_name_from_span() {
        let span = SegmentSpan {
            index: 2,
            start_sec: 240.0,
            end_sec: 250.0,
        };
        let segment = Segment::new(&VideoId::from("v1"), span, PathBuf::from("/tmp/p.mp4"));
        assert_eq!(segment.name, "v1-part-2");
        assert_eq!(segment.index(), 2);
        assert!((segment.span.duration() - 10.0).abs() < f64::EPSILON);
    }
}
