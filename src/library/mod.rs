use crate::config::LibraryConfig;

pub mod filter;
pub mod playlist;
pub mod sample;
pub mod stats;
pub mod store;

use store::{SharedStore, TrackStore};

/// Opens the in-memory library, seeded with the sample catalogue if configured.
pub fn open_store(config: &LibraryConfig) -> anyhow::Result<SharedStore> {
    let store = if config.seed_sample {
        TrackStore::with_tracks(sample::sample_tracks()?)
    } else {
        TrackStore::new()
    };
    log::info!("Library opened with {} tracks", store.len());
    Ok(store.shared())
}
