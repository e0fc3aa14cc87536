use anyhow::Context;
use serde_json::Value;

use crate::{domain::track::TrackRecord, ingest::normalize::normalize};

const SAMPLE_TRACKS: &str = include_str!("../../data/sample_tracks.json");

/// Demo catalogue shipped with the binary, read through the same
/// normalization as any submitted track.
pub fn sample_tracks() -> anyhow::Result<Vec<TrackRecord>> {
    let payloads: Vec<Value> =
        serde_json::from_str(SAMPLE_TRACKS).with_context(|| "Failed to parse sample catalogue")?;

    payloads
        .iter()
        .enumerate()
        .map(|(i, payload)| {
            normalize(payload).with_context(|| format!("Invalid sample track at index {i}"))
        })
        .collect()
}
