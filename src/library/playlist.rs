//! User built playlists over library tracks.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::track::{TrackRecord, UNKNOWN_LABEL};

pub type SharedPlaylists = Arc<Mutex<PlaylistStore>>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaylistError {
    #[error("playlist name is required")]
    MissingName,

    #[error("add at least one track to the playlist")]
    NoTracks,
}

/// Result of adding a track to a playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    /// assigned by [`PlaylistStore::insert`], 0 before that
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub tracks: Vec<TrackRecord>,
}

impl Playlist {
    /// Fails on a blank name or an empty track list. Blank description and
    /// cover image are dropped, repeated track ids are kept once.
    pub fn create(
        name: &str,
        description: Option<&str>,
        cover_image: Option<&str>,
        tracks: Vec<TrackRecord>,
    ) -> Result<Self, PlaylistError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlaylistError::MissingName);
        }
        if tracks.is_empty() {
            return Err(PlaylistError::NoTracks);
        }

        let mut playlist = Self {
            id: 0,
            name: name.to_string(),
            description: non_blank(description),
            cover_image: non_blank(cover_image),
            tracks: Vec::with_capacity(tracks.len()),
        };
        for track in tracks {
            playlist.add(track);
        }
        Ok(playlist)
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.tracks.iter().any(|t| t.id == track_id)
    }

    /// Appends `track` unless a track with the same id is already present.
    pub fn add(&mut self, track: TrackRecord) -> AddOutcome {
        if self.contains(&track.id) {
            return AddOutcome::AlreadyPresent;
        }
        self.tracks.push(track);
        AddOutcome::Added
    }

    /// true if a track was removed
    pub fn remove(&mut self, track_id: &str) -> bool {
        let before = self.tracks.len();
        self.tracks.retain(|t| t.id != track_id);
        before != self.tracks.len()
    }

    /// Most frequent top genre across the tracks, first seen wins ties.
    pub fn primary_genre(&self) -> &str {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for track in &self.tracks {
            *counts.entry(track.top_genre()).or_default() += 1;
        }

        let mut best: Option<(&str, usize)> = None;
        for track in &self.tracks {
            let genre = track.top_genre();
            let count = counts[genre];
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((genre, count));
            }
        }
        best.map(|(genre, _)| genre).unwrap_or(UNKNOWN_LABEL)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.tracks.iter().map(|t| t.duration_seconds).sum()
    }

    pub fn summary(&self) -> PlaylistSummary {
        PlaylistSummary {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            cover_image: self.cover_image.clone(),
            track_count: self.tracks.len(),
            primary_genre: self.primary_genre().to_string(),
            duration_seconds: self.duration_seconds(),
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// The playlist card: everything but the tracks themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub track_count: usize,
    pub primary_genre: String,
    pub duration_seconds: f64,
}

/// In-memory playlists in creation order. Playlists hold copies of their
/// tracks, so removing a track from the library leaves them untouched.
#[derive(Debug, Default)]
pub struct PlaylistStore {
    next_id: u64,
    playlists: Vec<Playlist>,
}

impl PlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedPlaylists {
        Arc::new(Mutex::new(self))
    }

    /// Stores `playlist` under a fresh id and returns it.
    pub fn insert(&mut self, mut playlist: Playlist) -> &Playlist {
        self.next_id += 1;
        playlist.id = self.next_id;
        self.playlists.push(playlist);
        &self.playlists[self.playlists.len() - 1]
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn get(&self, id: u64) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Playlist> {
        self.playlists.iter_mut().find(|p| p.id == id)
    }

    /// true if the playlist existed
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.playlists.len();
        self.playlists.retain(|p| p.id != id);
        before != self.playlists.len()
    }
}
