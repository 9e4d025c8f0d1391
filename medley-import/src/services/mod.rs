//! Service modules for the import pipeline
//!
//! - Source readers: folder scanner, library export, tag reader
//! - Pipeline: partition action, progress, error collector, worker pools
//! - Orchestrator: one import request end to end

pub mod error_collector;
pub mod file_scanner;
pub mod library_export;
pub mod metadata_extractor;
pub mod orchestrator;
pub mod partition;
pub mod progress;
pub mod worker_pools;

pub use error_collector::ErrorCollector;
pub use file_scanner::{FileScanner, ScanError};
pub use library_export::{ExportError, LibraryExport, LibraryPlaylistEntry, LibraryTrackEntry};
pub use metadata_extractor::{AudioMetadata, MetadataError, MetadataExtractor, TagReader};
pub use orchestrator::{ImportOrchestrator, ImportServices};
pub use partition::{ImportContext, NodeInfo, PartitionAction, PartitionHook, PartitionNode};
pub use progress::{EventProgressReporter, ProgressReporter, ProgressState, ProgressTracker};
pub use worker_pools::WorkerPools;
