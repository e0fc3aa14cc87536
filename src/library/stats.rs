//! Aggregates over the library, the data behind the dashboard charts

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::track::TrackRecord;

/// (name, lower bound) of each bpm bucket, a bucket ends where the next begins
const BPM_BUCKETS: &[(&str, f64)] = &[
    ("60-80", 60.0),
    ("81-100", 81.0),
    ("101-120", 101.0),
    ("121-140", 121.0),
    ("141-160", 141.0),
    ("160+", 161.0),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Count {
    pub name: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Percentage {
    pub name: String,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub track_count: usize,
    pub genre_distribution: Vec<Count>,
    pub mood_distribution: Vec<Count>,
    pub bpm_distribution: Vec<Count>,
    pub energy_by_genre: Vec<Percentage>,
    pub instrument_prevalence: Vec<Percentage>,
}

impl LibraryStats {
    pub fn compute(tracks: &[TrackRecord]) -> Self {
        Self {
            track_count: tracks.len(),
            genre_distribution: distribution(tracks.iter().map(|t| t.top_genre())),
            mood_distribution: distribution(tracks.iter().map(|t| t.top_mood())),
            bpm_distribution: bpm_distribution(tracks),
            energy_by_genre: mean_percentages(tracks.iter().map(|t| (t.top_genre(), t.energy))),
            instrument_prevalence: mean_percentages(
                tracks
                    .iter()
                    .flat_map(|t| &t.instrument_scores)
                    .map(|i| (i.instrument.as_str(), i.score)),
            ),
        }
    }
}

fn distribution<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<Count> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }

    let mut counts: Vec<Count> = counts
        .into_iter()
        .map(|(name, value)| Count {
            name: name.to_string(),
            value,
        })
        .collect();
    counts.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    counts
}

fn bpm_distribution(tracks: &[TrackRecord]) -> Vec<Count> {
    let mut counts = vec![0usize; BPM_BUCKETS.len()];
    for track in tracks {
        if let Some(bucket) = BPM_BUCKETS.iter().rposition(|(_, min)| track.bpm >= *min) {
            counts[bucket] += 1;
        }
    }

    BPM_BUCKETS
        .iter()
        .zip(counts)
        .map(|((name, _), value)| Count {
            name: name.to_string(),
            value,
        })
        .collect()
}

/// mean of the values per name, scaled to a percentage, highest first
fn mean_percentages<'a>(values: impl Iterator<Item = (&'a str, f64)>) -> Vec<Percentage> {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for (name, value) in values {
        let entry = sums.entry(name).or_default();
        entry.0 += value;
        entry.1 += 1;
    }

    let mut percentages: Vec<Percentage> = sums
        .into_iter()
        .map(|(name, (total, count))| Percentage {
            name: name.to_string(),
            percent: total / count as f64 * 100.0,
        })
        .collect();
    percentages.sort_by(|a, b| {
        b.percent
            .total_cmp(&a.percent)
            .then_with(|| a.name.cmp(&b.name))
    });
    percentages
}
