//! Source-level import entry points
//!
//! Opens a source (folder or library export), turns it into import requests
//! and runs them through the matching orchestrators. Opening the source is
//! part of startup: a source that cannot be opened is a fatal failure and no
//! worker is dispatched.

use crate::error::{ImportError, ImportResult};
use crate::models::{
    FieldSource, ImportPolicy, ImportReport, ImportRequest, PlaylistCatalogue, TrackCatalogue,
    TrackKey,
};
use crate::parsers::{AudioFileParser, LibraryPlaylistParser, LibraryTrackParser};
use crate::services::file_scanner::FileScanner;
use crate::services::library_export::LibraryExport;
use crate::services::metadata_extractor::TagReader;
use crate::services::orchestrator::{ImportOrchestrator, ImportServices};
use crate::services::partition::PartitionHook;
use medley_common::events::SourceKind;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Reports of a library export import
#[derive(Debug)]
pub struct LibraryImport {
    pub tracks: ImportReport<TrackCatalogue>,
    /// `None` when the track import was cancelled
    pub playlists: Option<ImportReport<PlaylistCatalogue>>,
}

impl LibraryImport {
    pub fn is_cancelled(&self) -> bool {
        self.tracks.is_cancelled()
            || self
                .playlists
                .as_ref()
                .is_some_and(ImportReport::is_cancelled)
    }
}

/// Imports folders and library exports into the catalogue
pub struct MediaImporter {
    services: ImportServices,
    reader: Arc<dyn TagReader>,
    scanner: FileScanner,
    hook: Option<Arc<dyn PartitionHook>>,
}

impl MediaImporter {
    pub fn new(services: ImportServices, reader: Arc<dyn TagReader>) -> Self {
        Self {
            services,
            reader,
            scanner: FileScanner::new(),
            hook: None,
        }
    }

    pub fn with_scanner(mut self, scanner: FileScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Observe partition decisions of every run
    pub fn with_hook(mut self, hook: Arc<dyn PartitionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn services(&self) -> &ImportServices {
        &self.services
    }

    fn orchestrator<P>(&self, parser: P) -> ImportOrchestrator<P>
    where
        P: crate::parsers::ItemParser + 'static,
        P::Item: 'static,
        P::Output: 'static,
    {
        let orchestrator = ImportOrchestrator::new(parser, self.services.clone());
        match &self.hook {
            Some(hook) => orchestrator.with_hook(Arc::clone(hook)),
            None => orchestrator,
        }
    }

    /// Import every audio file below `root`
    pub async fn import_folder(
        &self,
        root: &Path,
        priority: bool,
        cancel: CancellationToken,
    ) -> ImportResult<ImportReport<TrackCatalogue>> {
        let files = {
            let scanner = self.scanner.clone();
            let root = root.to_path_buf();
            tokio::task::spawn_blocking(move || scanner.scan(&root))
                .await
                .map_err(|e| ImportError::Worker(e.to_string()))?
                .map_err(|e| self.services.fatal(SourceKind::AudioFiles, e.into()))?
        };

        tracing::info!(root = %root.display(), files = files.len(), "Folder scanned");

        self.import_files(files, priority, cancel).await
    }

    /// Import an explicit list of audio files
    pub async fn import_files(
        &self,
        files: Vec<PathBuf>,
        priority: bool,
        cancel: CancellationToken,
    ) -> ImportResult<ImportReport<TrackCatalogue>> {
        let request = ImportRequest::new(SourceKind::AudioFiles, files, ImportPolicy::default())
            .with_priority(priority);
        self.orchestrator(AudioFileParser::new(Arc::clone(&self.reader)))
            .run(request, cancel)
            .await
    }

    /// Import tracks, then playlists, from a library export file
    pub async fn import_library(
        &self,
        export_path: &Path,
        policy: ImportPolicy,
        priority: bool,
        cancel: CancellationToken,
    ) -> ImportResult<LibraryImport> {
        let export = {
            let path = export_path.to_path_buf();
            tokio::task::spawn_blocking(move || LibraryExport::open(&path))
                .await
                .map_err(|e| ImportError::Worker(e.to_string()))?
                .map_err(|e| self.services.fatal(SourceKind::LibraryTracks, e.into()))?
        };

        self.import_export(export, policy, priority, cancel).await
    }

    /// Import tracks, then playlists, from a parsed library export
    ///
    /// Playlists are skipped when the track import is cancelled.
    pub async fn import_export(
        &self,
        export: LibraryExport,
        policy: ImportPolicy,
        priority: bool,
        cancel: CancellationToken,
    ) -> ImportResult<LibraryImport> {
        let track_keys = export.track_keys();
        let playlists = export.user_playlists();
        let LibraryExport { tracks, .. } = export;

        let request =
            ImportRequest::new(SourceKind::LibraryTracks, tracks, policy).with_priority(priority);
        let tracks = self
            .orchestrator(LibraryTrackParser::new(Arc::clone(&self.reader)))
            .run(request, cancel.clone())
            .await?;

        if tracks.is_cancelled() {
            return Ok(LibraryImport {
                tracks,
                playlists: None,
            });
        }

        // Members resolve only to tracks that made it into the catalogue
        let track_keys: HashMap<i64, TrackKey> = track_keys
            .into_iter()
            .filter(|(_, key)| tracks.outcome.result.contains(key))
            .collect();

        let request = ImportRequest::new(
            SourceKind::LibraryPlaylists,
            playlists,
            ImportPolicy::new(FieldSource::LibraryExport, false),
        );
        let playlists = self
            .orchestrator(LibraryPlaylistParser::new(track_keys))
            .run(request, cancel)
            .await?;

        Ok(LibraryImport {
            tracks,
            playlists: Some(playlists),
        })
    }
}
