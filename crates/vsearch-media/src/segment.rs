//! Fixed-interval video splitting.
//!
//! The split is planned from the probed duration and a single interval
//! value: the loop step and the end bound use the same interval, so spans
//! are contiguous, non-overlapping, and cover `[0, duration)` exactly.

use std::path::Path;

use tracing::{debug, info};

use vsearch_models::{Segment, SegmentSpan, VideoId};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;

/// Plan segment spans for a video of `duration_secs`.
///
/// Produces `ceil(duration / interval)` spans; span `i` covers
/// `[i * interval, min((i + 1) * interval, duration))`.
pub fn plan_segments(duration_secs: f64, interval_secs: u32) -> Vec<SegmentSpan> {
    if duration_secs <= 0.0 || interval_secs == 0 {
        return Vec::new();
    }

    let interval = interval_secs as f64;
    let parts = (duration_secs / interval).ceil() as usize;

    (0..parts)
        .map(|index| {
            let start_sec = index as f64 * interval;
            let end_sec = (start_sec + interval).min(duration_secs);
            SegmentSpan {
                index,
                start_sec,
                end_sec,
            }
        })
        .collect()
}

/// Split a source video into fixed-interval segment files.
///
/// Segment files are written to `out_dir` as `{video_id}-part-{index}.mp4`
/// using stream copy. The returned segments are ordered by index, which
/// downstream timestamp reconstruction depends on.
pub async fn split_video(
    input: impl AsRef<Path>,
    video_id: &VideoId,
    interval_secs: u32,
    out_dir: impl AsRef<Path>,
) -> MediaResult<Vec<Segment>> {
    let input = input.as_ref();
    let out_dir = out_dir.as_ref();

    let info = probe_video(input).await?;
    debug!(
        "Probed {}: duration {:.1}s, {}x{} ({})",
        input.display(),
        info.duration,
        info.width,
        info.height,
        info.codec
    );

    let spans = plan_segments(info.duration, interval_secs);
    if spans.is_empty() {
        return Err(MediaError::invalid_video(format!(
            "Video {} produced no segments (duration {:.1}s, interval {}s)",
            input.display(),
            info.duration,
            interval_secs
        )));
    }

    let runner = FfmpegRunner::new();
    let mut segments = Vec::with_capacity(spans.len());

    for span in spans {
        let name = video_id.segment_name(span.index);
        let path = out_dir.join(format!("{}.mp4", name));

        let cmd = FfmpegCommand::new(input, &path)
            .seek(span.start_sec)
            .duration(span.duration())
            .codec_copy();

        runner.run(&cmd).await?;
        segments.push(Segment::new(video_id, span, path));
    }

    info!(
        "Split {} into {} segments of {}s",
        video_id,
        segments.len(),
        interval_secs
    );

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_250s_at_120s_interval() {
        // A 250-second video with interval_seconds=120 yields 3 segments
        // [0,120), [120,240), [240,250).
        let spans = plan_segments(250.0, 120);
        assert_eq!(spans.len(), 3);
        assert_eq!((spans[0].start_sec, spans[0].end_sec), (0.0, 120.0));
        assert_eq!((spans[1].start_sec, spans[1].end_sec), (120.0, 240.0));
        assert_eq!((spans[2].start_sec, spans[2].end_sec), (240.0, 250.0));
    }

    #[test]
    fn test_plan_exact_multiple() {
        let spans = plan_segments(240.0, 120);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].end_sec, 240.0);
    }

    #[test]
    fn test_plan_shorter_than_interval() {
        let spans = plan_segments(45.0, 120);
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start_sec, spans[0].end_sec), (0.0, 45.0));
    }

    #[test]
    fn test_plan_spans_are_contiguous_and_cover_duration() {
        for (duration, interval) in [(250.0, 120u32), (601.5, 60), (5.0, 5), (3599.9, 300)] {
            let spans = plan_segments(duration, interval);
            assert_eq!(spans.len(), (duration / interval as f64).ceil() as usize);
            assert_eq!(spans[0].start_sec, 0.0);
            for pair in spans.windows(2) {
                assert_eq!(pair[0].end_sec, pair[1].start_sec);
                assert!(pair[0].start_sec < pair[0].end_sec);
            }
            assert_eq!(spans.last().unwrap().end_sec, duration);
            for (i, span) in spans.iter().enumerate() {
                assert_eq!(span.index, i);
            }
        }
    }

    #[test]
    fn test_plan_degenerate_inputs() {
        assert!(plan_segments(0.0, 120).is_empty());
        assert!(plan_segments(-10.0, 120).is_empty());
        assert!(plan_segments(100.0, 0).is_empty());
    }
}
