use std::sync::{Arc, Mutex};

use crate::{domain::track::TrackRecord, library::filter::TrackFilter};

pub type SharedStore = Arc<Mutex<TrackStore>>;

/// In-memory, ordered list of accepted tracks.
///
/// Ids are not unique: a caller supplied id is stored as given.
#[derive(Debug, Default)]
pub struct TrackStore {
    tracks: Vec<TrackRecord>,
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracks(tracks: Vec<TrackRecord>) -> Self {
        Self { tracks }
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn append(&mut self, track: TrackRecord) {
        self.tracks.push(track);
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tracks.iter().any(|t| t.id == id)
    }

    /// first track stored under `id`
    pub fn find(&self, id: &str) -> Option<&TrackRecord> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// removes every track stored under `id`, returns how many were removed
    pub fn remove(&mut self, id: &str) -> usize {
        let before = self.tracks.len();
        self.tracks.retain(|t| t.id != id);
        before - self.tracks.len()
    }

    pub fn filter(&self, filter: &TrackFilter) -> Vec<&TrackRecord> {
        self.tracks.iter().filter(|t| filter.matches(t)).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
