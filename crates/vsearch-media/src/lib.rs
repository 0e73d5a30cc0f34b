//! FFmpeg CLI wrapper for video segmentation.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Duration probing via FFprobe
//! - Fixed-interval splitting of a source video into segment files

pub mod command;
pub mod error;
pub mod probe;
pub mod segment;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use segment::{plan_segments, split_video};
