//! Desktop media library export reader
//!
//! Reads the property-list XML document a desktop media library writes when
//! asked to export its library:
//!
//! ```xml
//! <plist version="1.0">
//! <dict>
//!   <key>Tracks</key>
//!   <dict>
//!     <key>101</key>
//!     <dict>
//!       <key>Track ID</key><integer>101</integer>
//!       <key>Name</key><string>Intro</string>
//!       <key>Play Count</key><integer>3</integer>
//!       <key>Location</key><string>file:///music/intro.mp3</string>
//!     </dict>
//!   </dict>
//!   <key>Playlists</key>
//!   <array>
//!     <dict>
//!       <key>Name</key><string>Mix</string>
//!       <key>Playlist Persistent ID</key><string>AB12</string>
//!       <key>Playlist Items</key>
//!       <array><dict><key>Track ID</key><integer>101</integer></dict></array>
//!     </dict>
//!   </array>
//! </dict>
//! </plist>
//! ```
//!
//! Only the document structure is checked here. Whether a track's backing
//! file still exists is a per-item question answered by the parsers.

use crate::models::TrackKey;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Errors reading a library export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    MalformedXml(String),

    #[error("Not a library export: {0}")]
    NotAnExport(String),
}

/// One entry of the export's flat track collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryTrackEntry {
    pub track_id: i64,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Duration in milliseconds ("Total Time")
    pub total_time_ms: Option<u64>,
    /// Bit rate in kbps
    pub bit_rate: Option<u32>,
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
    /// As declared; exports have been seen with negative counts
    pub play_count: i64,
    /// Backing file as a URI
    pub location: Option<String>,
}

impl LibraryTrackEntry {
    /// Identifier used in failure reports
    pub fn source_id(&self) -> String {
        match &self.title {
            Some(title) => format!("track {} ({})", self.track_id, title),
            None => format!("track {}", self.track_id),
        }
    }

    /// Local path of the backing file, if the location is a `file://` URI
    pub fn file_path(&self) -> Option<PathBuf> {
        self.location.as_deref().and_then(location_to_path)
    }
}

/// One entry of the export's playlist collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryPlaylistEntry {
    pub persistent_id: Option<String>,
    /// Containing folder's persistent id
    pub parent_persistent_id: Option<String>,
    pub name: Option<String>,
    pub folder: bool,
    /// The whole-library pseudo playlist
    pub master: bool,
    /// Member track ids, in declared order
    pub track_ids: Vec<i64>,
    /// Index of the entry in the export's playlist array
    pub position: usize,
}

impl LibraryPlaylistEntry {
    /// Identifier used in failure reports
    pub fn source_id(&self) -> String {
        match (&self.persistent_id, &self.name) {
            (Some(id), Some(name)) => format!("playlist {} ({})", id, name),
            (Some(id), None) => format!("playlist {}", id),
            (None, Some(name)) => format!("playlist #{} ({})", self.position, name),
            (None, None) => format!("playlist #{}", self.position),
        }
    }
}

/// Parsed library export
#[derive(Debug, Clone, Default)]
pub struct LibraryExport {
    pub tracks: Vec<LibraryTrackEntry>,
    pub playlists: Vec<LibraryPlaylistEntry>,
}

impl LibraryExport {
    /// Read and parse an export file
    pub fn open(path: &Path) -> Result<Self, ExportError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse an export document
    pub fn parse(xml: &str) -> Result<Self, ExportError> {
        // Exports carry a DOCTYPE line
        let mut options = roxmltree::ParsingOptions::default();
        options.allow_dtd = true;

        let doc = roxmltree::Document::parse_with_options(xml, options)
            .map_err(|e| ExportError::MalformedXml(e.to_string()))?;

        let root = doc.root_element();
        if root.tag_name().name() != "plist" {
            return Err(ExportError::NotAnExport(
                "root element must be <plist>".to_string(),
            ));
        }

        let top = root
            .children()
            .find(|n| n.is_element())
            .ok_or_else(|| ExportError::NotAnExport("empty <plist>".to_string()))?;
        let Value::Dict(entries) = parse_value(top)? else {
            return Err(ExportError::NotAnExport(
                "top-level value must be a <dict>".to_string(),
            ));
        };

        let mut export = LibraryExport::default();

        for (key, value) in entries {
            match (key.as_str(), value) {
                ("Tracks", Value::Dict(tracks)) => {
                    for (_, track) in tracks {
                        if let Value::Dict(fields) = track {
                            export.tracks.push(track_entry(fields));
                        }
                    }
                }
                ("Playlists", Value::Array(playlists)) => {
                    for (position, playlist) in playlists.into_iter().enumerate() {
                        if let Value::Dict(fields) = playlist {
                            export.playlists.push(playlist_entry(fields, position));
                        }
                    }
                }
                ("Tracks", _) | ("Playlists", _) => {
                    return Err(ExportError::NotAnExport(format!(
                        "unexpected value type for '{}'",
                        key
                    )));
                }
                _ => {}
            }
        }

        tracing::debug!(
            tracks = export.tracks.len(),
            playlists = export.playlists.len(),
            "Parsed library export"
        );

        Ok(export)
    }

    /// Playlists other than the whole-library pseudo playlist
    pub fn user_playlists(&self) -> Vec<LibraryPlaylistEntry> {
        self.playlists.iter().filter(|p| !p.master).cloned().collect()
    }

    /// Track id → catalogue key, for tracks with a local backing file
    pub fn track_keys(&self) -> HashMap<i64, TrackKey> {
        self.tracks
            .iter()
            .filter_map(|t| {
                t.file_path()
                    .map(|path| (t.track_id, TrackKey::for_location(&path)))
            })
            .collect()
    }
}

/// Decode a `file://` location URI into a local path
pub fn location_to_path(location: &str) -> Option<PathBuf> {
    Url::parse(location).ok()?.to_file_path().ok()
}

/// Property-list value
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Dict(Vec<(String, Value)>),
    Array(Vec<Value>),
    Integer(i64),
    Real(f64),
    String(String),
    Bool(bool),
    Other,
}

impl Value {
    fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            // Only whole reals that fit; `as` would saturate or truncate
            Value::Real(r)
                if r.is_finite()
                    && r.fract() == 0.0
                    && *r >= i64::MIN as f64
                    && *r < i64::MAX as f64 =>
            {
                Some(*r as i64)
            }
            _ => None,
        }
    }

    fn as_u32(&self) -> Option<u32> {
        self.as_i64().and_then(|i| u32::try_from(i).ok())
    }

    fn as_bool(&self) -> bool {
        matches!(self, Value::Bool(true))
    }
}

fn parse_value(node: roxmltree::Node) -> Result<Value, ExportError> {
    let text = || node.text().unwrap_or("").trim();

    let value = match node.tag_name().name() {
        "dict" => {
            let mut entries = Vec::new();
            let mut pending_key: Option<String> = None;
            for child in node.children().filter(|n| n.is_element()) {
                if child.tag_name().name() == "key" {
                    pending_key = Some(child.text().unwrap_or("").to_string());
                    continue;
                }
                let key = pending_key.take().ok_or_else(|| {
                    ExportError::MalformedXml(format!(
                        "<{}> without preceding <key> at byte {}",
                        child.tag_name().name(),
                        child.range().start
                    ))
                })?;
                entries.push((key, parse_value(child)?));
            }
            Value::Dict(entries)
        }
        "array" => Value::Array(
            node.children()
                .filter(|n| n.is_element())
                .map(parse_value)
                .collect::<Result<_, _>>()?,
        ),
        "integer" => Value::Integer(text().parse().map_err(|_| {
            ExportError::MalformedXml(format!("invalid integer '{}'", text()))
        })?),
        "real" => Value::Real(
            text()
                .parse()
                .map_err(|_| ExportError::MalformedXml(format!("invalid real '{}'", text())))?,
        ),
        "string" => Value::String(node.text().unwrap_or("").to_string()),
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Other,
    };

    Ok(value)
}

fn track_entry(fields: Vec<(String, Value)>) -> LibraryTrackEntry {
    let mut entry = LibraryTrackEntry::default();
    for (key, value) in fields {
        match key.as_str() {
            "Track ID" => entry.track_id = value.as_i64().unwrap_or_default(),
            "Name" => entry.title = value.as_str().map(str::to_string),
            "Artist" => entry.artist = value.as_str().map(str::to_string),
            "Album" => entry.album = value.as_str().map(str::to_string),
            "Total Time" => entry.total_time_ms = value.as_i64().and_then(|ms| u64::try_from(ms).ok()),
            "Bit Rate" => entry.bit_rate = value.as_u32(),
            "Disc Number" => entry.disc_number = value.as_u32(),
            "Track Number" => entry.track_number = value.as_u32(),
            "Play Count" => entry.play_count = value.as_i64().unwrap_or_default(),
            "Location" => entry.location = value.as_str().map(str::to_string),
            _ => {}
        }
    }
    entry
}

fn playlist_entry(fields: Vec<(String, Value)>, position: usize) -> LibraryPlaylistEntry {
    let mut entry = LibraryPlaylistEntry {
        position,
        ..LibraryPlaylistEntry::default()
    };
    for (key, value) in fields {
        match key.as_str() {
            "Name" => entry.name = value.as_str().map(str::to_string),
            "Playlist Persistent ID" => entry.persistent_id = value.as_str().map(str::to_string),
            "Parent Persistent ID" => {
                entry.parent_persistent_id = value.as_str().map(str::to_string)
            }
            "Folder" => entry.folder = value.as_bool(),
            "Master" => entry.master = value.as_bool(),
            "Playlist Items" => {
                if let Value::Array(items) = value {
                    entry.track_ids = items
                        .iter()
                        .filter_map(|item| match item {
                            Value::Dict(item) => item
                                .iter()
                                .find(|(k, _)| k == "Track ID")
                                .and_then(|(_, v)| v.as_i64()),
                            _ => None,
                        })
                        .collect();
                }
            }
            _ => {}
        }
    }
    entry
}
