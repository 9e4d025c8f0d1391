//! medley-import library interface
//!
//! Concurrent fork/join import of music metadata from local audio files and
//! desktop media-library exports into the catalogue.
//!
//! Exposes public APIs for the binary and for integration testing.

pub mod error;
pub mod importer;
pub mod library;
pub mod models;
pub mod parsers;
pub mod services;

pub use crate::error::{ImportError, ImportResult};
pub use crate::importer::{LibraryImport, MediaImporter};
pub use crate::services::orchestrator::{ImportOrchestrator, ImportServices};
