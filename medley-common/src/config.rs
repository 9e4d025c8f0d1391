//! Configuration loading and resolution
//!
//! Import tuning is read from TOML. Resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `MEDLEY_CONFIG` environment variable
//! 3. `<user config dir>/medley/import.toml`
//! 4. Compiled defaults (fallback)

use crate::events::SourceKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MEDLEY_CONFIG";

/// Fork/join tuning for one source kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionTuning {
    /// Batches larger than this are forked
    pub threshold: usize,
    /// Number of contiguous sub-batches per fork
    pub partitions: usize,
}

/// Per-kind partition tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Full tag reads are expensive, so leaves stay small
    pub audio_files: PartitionTuning,
    /// Export fields are cheap to copy
    pub library_tracks: PartitionTuning,
    pub library_playlists: PartitionTuning,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            audio_files: PartitionTuning {
                threshold: 250,
                partitions: 4,
            },
            library_tracks: PartitionTuning {
                threshold: 3000,
                partitions: 2,
            },
            library_playlists: PartitionTuning {
                threshold: 500,
                partitions: 2,
            },
        }
    }
}

impl PartitionConfig {
    /// Tuning for a given source kind
    pub fn for_kind(&self, kind: SourceKind) -> PartitionTuning {
        match kind {
            SourceKind::AudioFiles => self.audio_files,
            SourceKind::LibraryTracks => self.library_tracks,
            SourceKind::LibraryPlaylists => self.library_playlists,
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Worker threads per source kind, independent of request size
    pub workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

/// Progress publication configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Upper bound on leaf progress events per second
    pub max_events_per_second: u32,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            max_events_per_second: 20,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter level ("trace" .. "error")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Import configuration (TOML file contents)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub pool: PoolConfig,
    pub progress: ProgressConfig,
    pub logging: LoggingConfig,
    pub partition: PartitionConfig,
}

impl ImportConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from an explicit file
    ///
    /// The file must exist and parse.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read TOML failed ({}): {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve configuration following the documented priority order
    ///
    /// Explicitly named files (CLI or environment) must load; the default
    /// location is optional and silently skipped when absent.
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_path {
            info!(path = %path.display(), "Loading config from command line path");
            return Self::load(path);
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                info!(path = %path, "Loading config from {}", CONFIG_ENV_VAR);
                return Self::load(Path::new(&path));
            }
        }

        // Priority 3: User config directory
        if let Some(path) = default_config_path() {
            if path.exists() {
                info!(path = %path.display(), "Loading config from user config directory");
                return Self::load(&path);
            }
        }

        // Priority 4: Compiled defaults
        warn!("No config file found, using compiled defaults");
        Ok(Self::default())
    }

    /// Validate tuning values
    pub fn validate(&self) -> Result<()> {
        if self.pool.workers == 0 {
            return Err(Error::Config("pool.workers must be at least 1".to_string()));
        }

        if self.progress.max_events_per_second == 0 {
            return Err(Error::Config(
                "progress.max_events_per_second must be at least 1".to_string(),
            ));
        }

        for kind in SourceKind::ALL {
            let tuning = self.partition.for_kind(kind);
            if tuning.threshold == 0 {
                return Err(Error::Config(format!(
                    "partition.{}.threshold must be at least 1",
                    kind
                )));
            }
            if tuning.partitions < 2 {
                return Err(Error::Config(format!(
                    "partition.{}.partitions must be at least 2 (got {})",
                    kind, tuning.partitions
                )));
            }
        }

        Ok(())
    }
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("medley").join("import.toml"))
}
