use crate::domain::track::{Prediction, TrackRecord};

/// Criteria for browsing the library. The default filter matches everything.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFilter {
    pub search: Option<String>,
    pub genres: Vec<String>,
    pub moods: Vec<String>,
    pub instruments: Vec<String>,
    pub bpm_range: (f64, f64),
    pub energy_range: (f64, f64),
}

impl Default for TrackFilter {
    fn default() -> Self {
        Self {
            search: None,
            genres: Vec::new(),
            moods: Vec::new(),
            instruments: Vec::new(),
            bpm_range: (f64::NEG_INFINITY, f64::INFINITY),
            energy_range: (f64::NEG_INFINITY, f64::INFINITY),
        }
    }
}

impl TrackFilter {
    pub fn matches(&self, track: &TrackRecord) -> bool {
        self.matches_search(track)
            && any_label_in(&track.genre_predictions, &self.genres)
            && any_label_in(&track.mood_predictions, &self.moods)
            && (self.instruments.is_empty()
                || track
                    .instrument_scores
                    .iter()
                    .any(|i| contains_ignore_case(&self.instruments, &i.instrument)))
            && within(track.bpm, self.bpm_range)
            && within(track.energy, self.energy_range)
    }

    fn matches_search(&self, track: &TrackRecord) -> bool {
        let Some(term) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        let term = term.to_lowercase();

        track.title.to_lowercase().contains(&term)
            || track.artist.to_lowercase().contains(&term)
            || track
                .genre_predictions
                .iter()
                .any(|g| g.label.to_lowercase().contains(&term))
    }
}

fn any_label_in(predictions: &[Prediction], wanted: &[String]) -> bool {
    wanted.is_empty()
        || predictions
            .iter()
            .any(|p| contains_ignore_case(wanted, &p.label))
}

fn contains_ignore_case(set: &[String], label: &str) -> bool {
    set.iter().any(|s| s.eq_ignore_ascii_case(label))
}

fn within(value: f64, (min, max): (f64, f64)) -> bool {
    min <= value && value <= max
}
