//! Turns an untrusted candidate payload into a fully populated [`TrackRecord`].
//!
//! `title` and `artist` are the only required fields. Every other field is
//! checked on its own and falls back to its default when it is missing or has
//! the wrong shape, so a bad `bpm` never blocks an otherwise valid track.

use serde_json::{Map, Value};

use crate::{
    domain::{
        track::{
            DEFAULT_BPM, DEFAULT_DURATION_SECONDS, DEFAULT_ENERGY, DEFAULT_LOUDNESS,
            InstrumentScore, PLACEHOLDER_ALBUM_ART, Prediction, TrackRecord,
        },
        youtube,
    },
    ingest::error::IngestError,
};

type Fields = Map<String, Value>;

/// time based id, milliseconds since unix epoch
pub fn fresh_track_id() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

pub fn normalize(payload: &Value) -> Result<TrackRecord, IngestError> {
    normalize_with_id(payload, fresh_track_id)
}

/// Same as [`normalize`], with the id source for payloads that carry no id.
pub fn normalize_with_id(
    payload: &Value,
    fresh_id: impl FnOnce() -> String,
) -> Result<TrackRecord, IngestError> {
    let fields = payload.as_object().ok_or_else(|| {
        IngestError::MalformedPayload(format!("expected a JSON object, got {}", kind(payload)))
    })?;

    let (title, artist) = match (required_text(fields, "title"), required_text(fields, "artist")) {
        (Some(title), Some(artist)) => (title, artist),
        (title, artist) => {
            let mut missing = Vec::new();
            if title.is_none() {
                missing.push("title");
            }
            if artist.is_none() {
                missing.push("artist");
            }
            return Err(IngestError::MissingRequiredField { fields: missing });
        }
    };

    Ok(TrackRecord {
        id: supplied_id(fields).unwrap_or_else(fresh_id),
        title,
        artist,
        album_art: text(fields, &["albumArt"]).unwrap_or_else(|| PLACEHOLDER_ALBUM_ART.to_string()),
        genre_predictions: predictions(fields, &["genrePredictions", "p_genre"], "genre")
            .unwrap_or_else(Prediction::unknown),
        mood_predictions: predictions(fields, &["moodPredictions", "p_mood"], "mood")
            .unwrap_or_else(Prediction::unknown),
        danceability_predictions: predictions(
            fields,
            &["danceabilityPredictions", "p_dance"],
            "danceability",
        )
        .unwrap_or_else(Prediction::unknown),
        instrument_scores: instruments(fields, &["instrumentScores", "instrument_scores"])
            .unwrap_or_else(InstrumentScore::other),
        bpm: number(fields, &["bpm"])
            .filter(|v| *v > 0.0)
            .unwrap_or(DEFAULT_BPM),
        energy: number(fields, &["energy"]).unwrap_or(DEFAULT_ENERGY),
        loudness: number(fields, &["loudness"]).unwrap_or(DEFAULT_LOUDNESS),
        duration_seconds: number(fields, &["durationSeconds", "duration_sec"])
            .filter(|v| *v > 0.0)
            .unwrap_or(DEFAULT_DURATION_SECONDS),
        youtube_id: text(fields, &["youtubeId"]).and_then(|s| youtube::parse_video_ref(&s)),
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// first non-null value among `keys`, canonical key listed first
fn lookup<'a>(fields: &'a Fields, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !value.is_null())
}

fn required_text(fields: &Fields, key: &str) -> Option<String> {
    text(fields, &[key])
}

fn text(fields: &Fields, keys: &[&str]) -> Option<String> {
    lookup(fields, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(fields: &Fields, keys: &[&str]) -> Option<f64> {
    lookup(fields, keys)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
}

fn supplied_id(fields: &Fields) -> Option<String> {
    match lookup(fields, &["id"])? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a list of `{label, score}` entries. `legacy_label` is the per-kind
/// key older clients use instead of `label` (`genre`, `mood`, ...).
fn predictions(fields: &Fields, keys: &[&str], legacy_label: &str) -> Option<Vec<Prediction>> {
    scored_entries(fields, keys, &["label", legacy_label])?
        .into_iter()
        .map(|(label, score)| (0.0..=1.0).contains(&score).then(|| Prediction::new(label, score)))
        .collect()
}

fn instruments(fields: &Fields, keys: &[&str]) -> Option<Vec<InstrumentScore>> {
    Some(
        scored_entries(fields, keys, &["instrument", "label"])?
            .into_iter()
            .map(|(name, score)| InstrumentScore::new(name, score))
            .collect(),
    )
}

/// non-empty array of objects each holding a text label and a finite score,
/// `None` as soon as one entry does not fit
fn scored_entries(
    fields: &Fields,
    keys: &[&str],
    label_keys: &[&str],
) -> Option<Vec<(String, f64)>> {
    let entries = lookup(fields, keys)?.as_array()?;
    if entries.is_empty() {
        return None;
    }

    entries
        .iter()
        .map(|entry| {
            let entry = entry.as_object()?;
            let label = text(entry, label_keys)?;
            let score = number(entry, &["score"])?;
            Some((label, score))
        })
        .collect()
}
