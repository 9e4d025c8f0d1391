//! Test Helper Utilities
//!
//! Shared fixtures for medley-import integration tests: a stub tag reader,
//! recording collaborators and an importer wired to them.

#![allow(dead_code)]

pub mod log_capture;

use medley_common::config::{ImportConfig, PartitionTuning};
use medley_common::events::{EventBus, ImportEvent, SourceKind};
use medley_import::library::{ErrorPresentation, InMemoryLibrary};
use medley_import::services::{AudioMetadata, MetadataError, NodeInfo, PartitionHook, TagReader};
use medley_import::{ImportServices, MediaImporter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Tag reader that never opens the file
///
/// - title: file stem
/// - artist: parent directory name
/// - `.bad` files fail as corrupt, `.xyz` files as unsupported
pub struct StubReader {
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubReader {
    pub fn new() -> Self {
        Self {
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep this long per read, to make runs long enough to cancel
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TagReader for StubReader {
    fn read_tags(&self, path: &Path) -> Result<AudioMetadata, MetadataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("bad") => Err(MetadataError::ReadError("truncated header".to_string())),
            Some("xyz") => Err(MetadataError::UnsupportedFormat("xyz".to_string())),
            _ => Ok(AudioMetadata {
                title: path.file_stem().map(|s| s.to_string_lossy().into_owned()),
                artist: path
                    .parent()
                    .and_then(Path::file_name)
                    .map(|s| s.to_string_lossy().into_owned()),
                format: "MP3".to_string(),
                ..AudioMetadata::default()
            }),
        }
    }
}

/// Error presentation that keeps what it was given
#[derive(Default)]
pub struct RecordingPresentation {
    pub batches: Mutex<Vec<Vec<String>>>,
    pub fatals: Mutex<Vec<(SourceKind, String)>>,
}

impl RecordingPresentation {
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn fatals(&self) -> Vec<(SourceKind, String)> {
        self.fatals.lock().unwrap().clone()
    }
}

impl ErrorPresentation for RecordingPresentation {
    fn present_errors(&self, _import_id: Uuid, errors: &[String]) {
        self.batches.lock().unwrap().push(errors.to_vec());
    }

    fn present_fatal(&self, kind: SourceKind, message: &str) {
        self.fatals.lock().unwrap().push((kind, message.to_string()));
    }
}

/// Counts forks and records leaves
#[derive(Default)]
pub struct CountingHook {
    forks: AtomicUsize,
    leaves: Mutex<Vec<NodeInfo>>,
}

impl CountingHook {
    pub fn forks(&self) -> usize {
        self.forks.load(Ordering::SeqCst)
    }

    pub fn leaves(&self) -> Vec<NodeInfo> {
        self.leaves.lock().unwrap().clone()
    }
}

impl PartitionHook for CountingHook {
    fn on_fork(&self, _node: NodeInfo, _parts: usize) {
        self.forks.fetch_add(1, Ordering::SeqCst);
    }

    fn on_leaf(&self, node: NodeInfo) {
        self.leaves.lock().unwrap().push(node);
    }
}

/// An importer wired to recording collaborators
pub struct Harness {
    pub importer: MediaImporter,
    pub library: Arc<InMemoryLibrary>,
    pub presentation: Arc<RecordingPresentation>,
    pub reader: Arc<StubReader>,
    pub hook: Arc<CountingHook>,
    pub event_bus: EventBus,
    pub events: broadcast::Receiver<ImportEvent>,
}

impl Harness {
    pub fn new(config: ImportConfig) -> Self {
        Self::with_reader(config, StubReader::new())
    }

    pub fn with_reader(config: ImportConfig, reader: StubReader) -> Self {
        let event_bus = EventBus::new(1 << 16);
        let events = event_bus.subscribe();
        let library = Arc::new(InMemoryLibrary::new());
        let presentation = Arc::new(RecordingPresentation::default());
        let reader = Arc::new(reader);
        let hook = Arc::new(CountingHook::default());

        let services = ImportServices::new(
            config,
            event_bus.clone(),
            presentation.clone(),
            library.clone(),
        );
        let importer = MediaImporter::new(services, reader.clone()).with_hook(hook.clone());

        Self {
            importer,
            library,
            presentation,
            reader,
            hook,
            event_bus,
            events,
        }
    }

    /// Every event published so far
    pub fn drain_events(&mut self) -> Vec<ImportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Default configuration with one kind's tuning replaced
pub fn config_with(kind: SourceKind, threshold: usize, partitions: usize) -> ImportConfig {
    let mut config = ImportConfig::default();
    let tuning = PartitionTuning {
        threshold,
        partitions,
    };
    match kind {
        SourceKind::AudioFiles => config.partition.audio_files = tuning,
        SourceKind::LibraryTracks => config.partition.library_tracks = tuning,
        SourceKind::LibraryPlaylists => config.partition.library_playlists = tuning,
    }
    config.progress.max_events_per_second = 1_000_000;
    config
}

/// Create `count` empty files named `track{i}.{ext}` under `dir`
pub fn create_files(dir: &Path, count: usize, ext: &str) -> Vec<PathBuf> {
    std::fs::create_dir_all(dir).unwrap();
    (0..count)
        .map(|i| {
            let path = dir.join(format!("track{:05}.{}", i, ext));
            std::fs::write(&path, b"").unwrap();
            path
        })
        .collect()
}
