//! Text search over indexed video segments.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use vsearch_models::segment_object_key;
use vsearch_vertex::Neighbor;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Free-text query
    pub query: String,
    /// Override the configured neighbor count
    #[serde(default)]
    pub neighbor_count: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    /// Matched datapoint
    pub datapoint_id: String,
    /// Segment object the match falls in
    pub segment: String,
    /// Distance reported by the index, smaller is closer
    pub distance: f64,
    /// Start of the matched moment, in seconds from the start of the
    /// original video
    pub start_sec: f64,
    /// Presigned playback URL for the segment, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play_url: Option<String>,
}

/// Search for moments matching a text query.
///
/// The query is embedded into the same vector space as the video
/// sub-intervals, so nearest neighbors in the index are the moments
/// that look like what the text describes.
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("Query must not be empty"));
    }

    let neighbor_count = request
        .neighbor_count
        .unwrap_or(state.config.default_neighbor_count);

    let start = std::time::Instant::now();

    let vector = state.embedding.embed_text(query).await?;
    let neighbors = state.matcher.find_neighbors(&vector, neighbor_count).await?;

    let mut results = Vec::with_capacity(neighbors.len());
    for neighbor in &neighbors {
        match describe_neighbor(
            neighbor,
            state.config.segment_interval_secs,
            state.config.embed_interval_secs,
        ) {
            Some(mut result) => {
                let key = segment_object_key(&result.segment);
                match state
                    .storage
                    .presign_get(&state.config.parts_bucket, &key, state.config.play_url_ttl)
                    .await
                {
                    Ok(url) => result.play_url = Some(url),
                    Err(e) => warn!("Presign failed for {}: {}", key, e),
                }
                results.push(result);
            }
            None => warn!("Skipping unparseable datapoint id '{}'", neighbor.datapoint_id),
        }
    }

    crate::metrics::record_search(start.elapsed().as_secs_f64());

    Ok(Json(SearchResponse { results }))
}

/// Turn a raw neighbor into a result with a reconstructed timestamp.
///
/// The datapoint id encodes segment index and 1-based sub-interval, so
/// the absolute start is `segment_index * segment_interval +
/// (sub - 1) * embed_interval`.
fn describe_neighbor(
    neighbor: &Neighbor,
    segment_interval_secs: u32,
    embed_interval_secs: u32,
) -> Option<SearchResult> {
    let id = &neighbor.datapoint_id;
    let (segment_name, _sub) = id.parse().ok()?;

    let segment_index: usize = segment_name.rsplit_once("-part-")?.1.parse().ok()?;
    let offset = id.start_sec(embed_interval_secs).ok()?;
    let start_sec = segment_index as f64 * segment_interval_secs as f64 + offset;

    Some(SearchResult {
        datapoint_id: id.as_str().to_string(),
        segment: segment_name,
        distance: neighbor.distance,
        start_sec,
        play_url: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neighbor(id: &str, distance: f64) -> Neighbor {
        Neighbor {
            datapoint_id: vsearch_models::DatapointId(id.to_string()),
            distance,
        }
    }

    #[test]
    fn reconstructs_absolute_timestamps() {
        // Segment 2 of a 120s interval, third 5s sub-interval:
        // 2*120 + 2*5 = 250.
        let result = describe_neighbor(&neighbor("talk-part-2_3", 0.31), 120, 5)
            .expect("parseable id");
        assert_eq!(result.segment, "talk-part-2");
        assert!((result.start_sec - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn first_sub_interval_starts_at_segment_boundary() {
        let result = describe_neighbor(&neighbor("talk-part-0_1", 0.1), 120, 5)
            .expect("parseable id");
        assert_eq!(result.start_sec, 0.0);

        let result = describe_neighbor(&neighbor("talk-part-1_1", 0.1), 120, 5)
            .expect("parseable id");
        assert_eq!(result.start_sec, 120.0);
    }

    #[test]
    fn skips_malformed_ids() {
        assert!(describe_neighbor(&neighbor("garbage", 0.5), 120, 5).is_none());
        assert!(describe_neighbor(&neighbor("talk-part-0_0", 0.5), 120, 5).is_none());
    }
}
