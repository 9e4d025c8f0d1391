//! Local audio file parser

use super::{classify_metadata_error, require_backing_file, track_from_tags, ItemParser, RecordOf};
use crate::models::{FailureReason, ImportPolicy, TrackCatalogue};
use crate::services::metadata_extractor::{MetadataExtractor, TagReader};
use medley_common::events::SourceKind;
use std::path::PathBuf;
use std::sync::Arc;

/// Reads a track from a local file's embedded tags
#[derive(Clone)]
pub struct AudioFileParser {
    reader: Arc<dyn TagReader>,
}

impl AudioFileParser {
    pub fn new(reader: Arc<dyn TagReader>) -> Self {
        Self { reader }
    }
}

impl Default for AudioFileParser {
    fn default() -> Self {
        Self::new(Arc::new(MetadataExtractor::new()))
    }
}

impl ItemParser for AudioFileParser {
    type Item = PathBuf;
    type Output = TrackCatalogue;

    fn kind(&self) -> SourceKind {
        SourceKind::AudioFiles
    }

    fn source_id(&self, item: &PathBuf) -> String {
        item.display().to_string()
    }

    fn parse(&self, item: &PathBuf, _policy: &ImportPolicy) -> Result<RecordOf<Self>, FailureReason> {
        require_backing_file(item)?;
        let metadata = self
            .reader
            .read_tags(item)
            .map_err(|e| classify_metadata_error(item, e))?;
        Ok(track_from_tags(item, metadata))
    }
}
