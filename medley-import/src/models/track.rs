//! Track records and the track catalogue result

use super::outcome::CatalogueResult;
use super::request::FieldSource;
use crate::library::LibrarySink;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Identity key of a track: its normalized backing file path
///
/// Two sources pointing at the same file resolve to the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackKey(String);

impl TrackKey {
    /// Derive the key for a backing file location
    ///
    /// Normalizes redundant separators and `.` components without touching
    /// the filesystem, so missing files still get a stable key.
    pub fn for_location(location: &Path) -> Self {
        let normalized: PathBuf = location.components().collect();
        Self(normalized.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Internal catalogue track record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Backing audio file
    pub location: PathBuf,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<Duration>,
    /// Bit rate in kbps
    pub bit_rate: Option<u32>,
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
    pub play_count: u32,
    /// Where the descriptive fields came from
    pub field_source: FieldSource,
}

impl Track {
    /// Bare record for a location, every optional field empty
    pub fn at(location: impl Into<PathBuf>, field_source: FieldSource) -> Self {
        Self {
            location: location.into(),
            title: None,
            artist: None,
            album: None,
            duration: None,
            bit_rate: None,
            disc_number: None,
            track_number: None,
            play_count: 0,
            field_source,
        }
    }

    pub fn key(&self) -> TrackKey {
        TrackKey::for_location(&self.location)
    }
}

/// Keyed track records plus a tracks-by-artist index
#[derive(Debug, Clone, Default)]
pub struct TrackCatalogue {
    tracks: HashMap<TrackKey, Track>,
    by_artist: BTreeMap<String, BTreeSet<TrackKey>>,
}

impl TrackCatalogue {
    pub fn get(&self, key: &TrackKey) -> Option<&Track> {
        self.tracks.get(key)
    }

    pub fn contains(&self, key: &TrackKey) -> bool {
        self.tracks.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TrackKey> {
        self.tracks.keys()
    }

    pub fn tracks(&self) -> impl Iterator<Item = (&TrackKey, &Track)> {
        self.tracks.iter()
    }

    /// Keys of tracks by one artist
    pub fn by_artist(&self, artist: &str) -> Option<&BTreeSet<TrackKey>> {
        self.by_artist.get(artist)
    }

    pub fn artists(&self) -> impl Iterator<Item = &String> {
        self.by_artist.keys()
    }
}

impl CatalogueResult for TrackCatalogue {
    type Record = Track;

    fn insert(&mut self, record: Track) -> bool {
        let key = record.key();
        if self.tracks.contains_key(&key) {
            return false;
        }
        if let Some(artist) = &record.artist {
            self.by_artist
                .entry(artist.clone())
                .or_default()
                .insert(key.clone());
        }
        self.tracks.insert(key, record);
        true
    }

    fn merge(&mut self, other: Self) -> usize {
        let mut skipped = HashSet::new();
        for (key, track) in other.tracks {
            if self.tracks.contains_key(&key) {
                skipped.insert(key);
                continue;
            }
            self.tracks.insert(key, track);
        }
        for (artist, keys) in other.by_artist {
            let accepted: Vec<TrackKey> = keys
                .into_iter()
                .filter(|key| !skipped.contains(key))
                .collect();
            if !accepted.is_empty() {
                self.by_artist.entry(artist).or_default().extend(accepted);
            }
        }
        skipped.len()
    }

    fn len(&self) -> usize {
        self.tracks.len()
    }

    fn deliver(&self, sink: &dyn LibrarySink, priority: bool) {
        sink.add_records(&self.tracks, priority);
    }
}
