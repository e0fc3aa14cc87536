use serde::{Deserialize, Serialize};

/// Album art used when a submitted track carries none.
pub const PLACEHOLDER_ALBUM_ART: &str = "https://images.unsplash.com/photo-1614613535308-eb5fbd3d2c17?w=800&auto=format&fit=crop&q=60";

pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_ENERGY: f64 = 0.5;
pub const DEFAULT_LOUDNESS: f64 = -7.0;
pub const DEFAULT_DURATION_SECONDS: f64 = 180.0;

pub const UNKNOWN_LABEL: &str = "Unknown";
pub const OTHER_INSTRUMENT: &str = "Other";

/// Represent a music track held by the library.
///
/// Every field is populated by the ingestion gateway before the record
/// reaches the store, records are never edited afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRecord {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album_art: String,
    pub genre_predictions: Vec<Prediction>,
    pub mood_predictions: Vec<Prediction>,
    pub danceability_predictions: Vec<Prediction>,
    pub instrument_scores: Vec<InstrumentScore>,
    pub bpm: f64,
    pub energy: f64,
    pub loudness: f64,
    pub duration_seconds: f64,
    #[serde(default)]
    pub youtube_id: Option<String>,
}

/// A classifier label with its confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }

    pub fn unknown() -> Vec<Prediction> {
        vec![Prediction::new(UNKNOWN_LABEL, 1.0)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentScore {
    pub instrument: String,
    pub score: f64,
}

impl InstrumentScore {
    pub fn new(instrument: impl Into<String>, score: f64) -> Self {
        Self {
            instrument: instrument.into(),
            score,
        }
    }

    pub fn other() -> Vec<InstrumentScore> {
        vec![InstrumentScore::new(OTHER_INSTRUMENT, 1.0)]
    }
}

impl TrackRecord {
    /// Highest scoring genre, later entries win ties.
    pub fn top_genre(&self) -> &str {
        top_label(&self.genre_predictions)
    }

    pub fn top_mood(&self) -> &str {
        top_label(&self.mood_predictions)
    }
}

fn top_label(predictions: &[Prediction]) -> &str {
    predictions
        .iter()
        .fold(None::<&Prediction>, |best, current| match best {
            Some(prev) if prev.score > current.score => Some(prev),
            _ => Some(current),
        })
        .map(|p| p.label.as_str())
        .unwrap_or(UNKNOWN_LABEL)
}
