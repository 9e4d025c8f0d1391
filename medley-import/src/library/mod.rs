//! Catalogue-side collaborators of an import
//!
//! The pipeline hands its merged result to a [`LibrarySink`] and its failure
//! report to an [`ErrorPresentation`]. Both are passed in explicitly.

mod presentation;

pub use presentation::{ErrorPresentation, EventPresentation, LogPresentation};

use crate::models::{Playlist, Track, TrackKey};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Receives the fully merged result of a completed import
///
/// Called exactly once per completed (non-cancelled) import.
pub trait LibrarySink: Send + Sync {
    /// Add track records; `priority` batches go ahead of existing entries
    ///
    /// The batch is borrowed; implementations copy only what they keep.
    fn add_records(&self, tracks: &HashMap<TrackKey, Track>, priority: bool);

    /// Add playlists, ordered as declared by the source
    fn add_playlists(&self, playlists: &[&Playlist]);
}

/// A track as stored by the catalogue, with its catalogue-assigned id
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogueEntry {
    pub id: Uuid,
    pub key: TrackKey,
    pub track: Track,
}

#[derive(Debug, Default)]
struct LibraryState {
    tracks: Vec<CatalogueEntry>,
    known: HashSet<TrackKey>,
    playlists: Vec<(Uuid, Playlist)>,
    deliveries: usize,
}

/// In-memory catalogue
///
/// Assigns a catalogue id to each record on arrival and never replaces an
/// entry whose key is already present.
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    state: Mutex<LibraryState>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LibraryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Tracks in catalogue order
    pub fn tracks(&self) -> Vec<CatalogueEntry> {
        self.state().tracks.clone()
    }

    pub fn track_count(&self) -> usize {
        self.state().tracks.len()
    }

    pub fn playlists(&self) -> Vec<Playlist> {
        self.state().playlists.iter().map(|(_, p)| p.clone()).collect()
    }

    /// Number of sink calls received so far
    pub fn deliveries(&self) -> usize {
        self.state().deliveries
    }
}

impl LibrarySink for InMemoryLibrary {
    fn add_records(&self, tracks: &HashMap<TrackKey, Track>, priority: bool) {
        let mut state = self.state();
        state.deliveries += 1;

        let mut incoming: Vec<(&TrackKey, &Track)> = tracks.iter().collect();
        incoming.sort_by(|a, b| a.0.cmp(b.0));

        let mut batch = Vec::with_capacity(incoming.len());
        for (key, track) in incoming {
            if !state.known.insert(key.clone()) {
                tracing::debug!(key = %key, "Track already in catalogue, skipping");
                continue;
            }
            batch.push(CatalogueEntry {
                id: Uuid::new_v4(),
                key: key.clone(),
                track: track.clone(),
            });
        }

        tracing::info!(added = batch.len(), priority, "Tracks added to catalogue");

        if priority {
            batch.append(&mut state.tracks);
            state.tracks = batch;
        } else {
            state.tracks.append(&mut batch);
        }
    }

    fn add_playlists(&self, playlists: &[&Playlist]) {
        let mut state = self.state();
        state.deliveries += 1;
        tracing::info!(added = playlists.len(), "Playlists added to catalogue");
        state
            .playlists
            .extend(playlists.iter().map(|p| (Uuid::new_v4(), (*p).clone())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldSource;
    use std::path::Path;

    fn batch(paths: &[&str]) -> HashMap<TrackKey, Track> {
        paths
            .iter()
            .map(|p| {
                (
                    TrackKey::for_location(Path::new(p)),
                    Track::at(*p, FieldSource::FileTags),
                )
            })
            .collect()
    }

    #[test]
    fn test_priority_batch_goes_first() {
        let library = InMemoryLibrary::new();
        library.add_records(&batch(&["/m/a.mp3"]), false);
        library.add_records(&batch(&["/m/b.mp3"]), true);

        let keys: Vec<String> = library
            .tracks()
            .iter()
            .map(|e| e.key.to_string())
            .collect();
        assert_eq!(keys, vec!["/m/b.mp3", "/m/a.mp3"]);
        assert_eq!(library.deliveries(), 2);
    }

    #[test]
    fn test_existing_key_is_not_replaced() {
        let library = InMemoryLibrary::new();
        library.add_records(&batch(&["/m/a.mp3"]), false);
        let first_id = library.tracks()[0].id;

        library.add_records(&batch(&["/m/a.mp3", "/m/c.mp3"]), false);

        assert_eq!(library.track_count(), 2);
        assert_eq!(library.tracks()[0].id, first_id);
    }
}
