//! medley-import - Music metadata import
//!
//! Imports local audio folders and desktop media-library exports into the
//! catalogue, reporting progress and a final summary on the console.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use medley_common::config::ImportConfig;
use medley_common::events::{EventBus, ImportEvent};
use medley_import::library::{EventPresentation, InMemoryLibrary};
use medley_import::models::{CatalogueResult, FieldSource, ImportPolicy, ImportReport};
use medley_import::services::MetadataExtractor;
use medley_import::{ImportServices, MediaImporter};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for medley-import
#[derive(Parser, Debug)]
#[command(name = "medley-import")]
#[command(about = "Import music metadata into the medley catalogue")]
#[command(version)]
struct Args {
    /// Configuration file (overrides MEDLEY_CONFIG and the default location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Insert imported tracks ahead of existing catalogue entries
    #[arg(long, global = true)]
    priority: bool,

    /// Print the import reports as JSON instead of summary lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import every audio file below a folder
    Folder {
        /// Root folder to scan
        path: PathBuf,
    },

    /// Import tracks and playlists from a library export
    Library {
        /// Exported library XML
        export: PathBuf,

        /// Authoritative source for track fields
        #[arg(long, value_enum, default_value_t = FieldSourceArg::Tags)]
        field_source: FieldSourceArg,

        /// Keep the export's play counts
        #[arg(long)]
        preserve_play_count: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FieldSourceArg {
    /// Read tags from each backing file
    Tags,
    /// Use the fields stored in the export
    Export,
}

impl From<FieldSourceArg> for FieldSource {
    fn from(arg: FieldSourceArg) -> Self {
        match arg {
            FieldSourceArg::Tags => FieldSource::FileTags,
            FieldSourceArg::Export => FieldSource::LibraryExport,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ImportConfig::resolve(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing (RUST_LOG wins over the configured level)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("medley_import={0},medley_common={0}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting medley-import {} ({}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let event_bus = EventBus::new(1024);
    let observer = tokio::spawn(log_events(event_bus.clone()));

    let library = Arc::new(InMemoryLibrary::new());
    let services = ImportServices::new(
        config,
        event_bus.clone(),
        Arc::new(EventPresentation::new(event_bus.clone())),
        library.clone(),
    );
    let importer = MediaImporter::new(services, Arc::new(MetadataExtractor::new()));

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let summary = match args.command {
        Command::Folder { path } => {
            let report = importer
                .import_folder(&path, args.priority, cancel)
                .await
                .context("Folder import failed")?;
            vec![render(&report, args.json)]
        }
        Command::Library {
            export,
            field_source,
            preserve_play_count,
        } => {
            let policy = ImportPolicy::new(field_source.into(), preserve_play_count);
            let import = importer
                .import_library(&export, policy, args.priority, cancel)
                .await
                .context("Library import failed")?;
            let mut lines = vec![render(&import.tracks, args.json)];
            if let Some(playlists) = &import.playlists {
                lines.push(render(playlists, args.json));
            }
            lines
        }
    };

    drop(importer);
    drop(event_bus);
    if let Err(e) = observer.await {
        warn!("Progress observer task failed: {}", e);
    }

    for line in summary {
        println!("{}", line);
    }
    if !args.json {
        println!(
            "Catalogue: {} tracks, {} playlists",
            library.track_count(),
            library.playlists().len()
        );
    }

    Ok(())
}

/// One report as a summary line, or as a JSON document
fn render<R: CatalogueResult>(report: &ImportReport<R>, json: bool) -> String {
    if !json {
        return report.summary();
    }
    let document = serde_json::json!({
        "import_id": report.import_id,
        "kind": report.kind,
        "status": report.status,
        "total": report.total,
        "processed": report.outcome.processed(),
        "succeeded": report.outcome.succeeded,
        "duplicates": report.outcome.duplicates,
        "records": report.outcome.records(),
        "not_found": report.outcome.not_found,
        "errors": report.outcome.errors,
        "elapsed_ms": u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
        "elapsed_text": report.elapsed_text,
    });
    serde_json::to_string_pretty(&document).unwrap_or_else(|_| report.summary())
}

/// Single progress observer: log every event published on the bus
///
/// Ends when every sender has been dropped.
async fn log_events(event_bus: EventBus) {
    let mut rx = event_bus.subscribe();
    drop(event_bus);

    loop {
        match rx.recv().await {
            Ok(ImportEvent::ImportStarted { kind, total, .. }) => {
                info!("Importing {} {} items", total, kind);
            }
            Ok(ImportEvent::ImportProgress {
                fraction: Some(fraction),
                completed,
                total,
                ..
            }) => {
                info!("{:5.1}% ({}/{})", fraction * 100.0, completed, total);
            }
            Ok(ImportEvent::ImportProgress {
                fraction: None,
                message: Some(message),
                ..
            }) => {
                info!("{}", message);
            }
            Ok(ImportEvent::ImportProgress { .. }) => {}
            Ok(ImportEvent::ImportFinished { status, .. }) => {
                info!("Import {:?}", status);
            }
            Ok(ImportEvent::ImportErrors { errors, .. }) => {
                if !errors.is_empty() {
                    warn!("{} errors occurred", errors.len());
                    for error in &errors {
                        warn!("  {}", error);
                    }
                }
            }
            Ok(ImportEvent::ImportStartFailed { kind, message, .. }) => {
                warn!("{} import could not start: {}", kind, message);
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Progress observer lagged, {} events skipped", skipped);
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            warn!("Ctrl+C received, cancelling import");
            cancel.cancel();
        }
        Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
    }
}
