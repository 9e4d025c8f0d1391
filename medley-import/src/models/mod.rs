//! Data models for medley-import
//!
//! - Import request and policy
//! - Track and playlist records with their keyed catalogue results
//! - Per-item failures, parse outcomes, final report

pub mod import_report;
pub mod item_failure;
pub mod outcome;
pub mod playlist;
pub mod request;
pub mod track;

pub use import_report::ImportReport;
pub use item_failure::{FailureKind, FailureReason, ItemFailure};
pub use outcome::{CatalogueResult, ParseOutcome};
pub use playlist::{Playlist, PlaylistCatalogue, PlaylistKind, PlaylistNode};
pub use request::{FieldSource, ImportPolicy, ImportRequest};
pub use track::{Track, TrackCatalogue, TrackKey};
