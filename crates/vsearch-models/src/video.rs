//! Source video models.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Video file extensions recognized when deriving a video id from an
/// uploaded object name.
const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".mkv", ".webm", ".avi"];

/// Identifier for a source video, derived from its object name.
///
/// Segment objects and embedding datapoint ids are all prefixed with this
/// value, so it must stay stable across re-ingestions of the same object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Derive a video id from a storage object name.
    ///
    /// Strips a known video extension and flattens path separators so the
    /// id is usable as a key prefix in other buckets.
    pub fn from_object_name(name: &str) -> Self {
        let mut base = name;
        for ext in VIDEO_EXTENSIONS {
            if let Some(stripped) = base.strip_suffix(ext) {
                base = stripped;
                break;
            }
        }
        Self(base.replace('/', "-"))
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Object name of segment `index` for this video.
    pub fn segment_name(&self, index: usize) -> String {
        format!("{}-part-{}", self.0, index)
    }

    /// Key prefix shared by all segment objects of this video.
    pub fn segment_prefix(&self) -> String {
        format!("{}-part-", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A video object in storage, as named by a change notification.
///
/// Immutable once created; the bucket owner is the only party that
/// deletes the source object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SourceVideo {
    /// Bucket holding the uploaded video
    pub bucket: String,
    /// Object name within the bucket
    pub name: String,
}

impl SourceVideo {
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
        }
    }

    /// Video id derived from the object name.
    pub fn video_id(&self) -> VideoId {
        VideoId::from_object_name(&self.name)
    }

    /// `gs://` locator for the source object.
    pub fn gcs_uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.name)
    }
}

impl fmt::Display for SourceVideo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_strips_extension() {
        let id = VideoId::from_object_name("animals.mp4");
        assert_eq!(id.as_str(), "animals");
    }

    #[test]
    fn test_video_id_flattens_paths() {
        let id = VideoId::from_object_name("uploads/game7.mov");
        assert_eq!(id.as_str(), "uploads-game7");
    }

    #[test]
    fn test_video_id_without_extension_unchanged() {
        let id = VideoId::from_object_name("raw-capture");
        assert_eq!(id.as_str(), "raw-capture");
    }

    #[test]
    fn test_segment_name() {
        let id = VideoId::from_object_name("v1.mp4");
        assert_eq!(id.segment_name(0), "v1-part-0");
        assert_eq!(id.segment_name(12), "v1-part-12");
        assert_eq!(id.segment_prefix(), "v1-part-");
    }

    #[test]
    fn test_source_video_gcs_uri() {
        let video = SourceVideo::new("b", "x.mp4");
        assert_eq!(video.gcs_uri(), "gs://b/x.mp4");
        assert_eq!(video.video_id().as_str(), "x");
    }
}
