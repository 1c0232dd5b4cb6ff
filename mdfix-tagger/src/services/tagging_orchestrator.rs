//! Per-file tagging
//!
//! Drives one file through inspection, fingerprint identification and tag
//! writing, falling back to the filename when identification fails.
//!
//! **State machine:**
//! 1. Already tagged → done, no network call
//! 2. Identified → write tags → done
//! 3. Not identified → parse "Artist - Title" from the file stem → write → done
//! 4. No usable filename, or any write error → failed

use crate::services::identifier::Identifier;
use crate::services::tag_inspector::TagInspector;
use crate::services::tag_store::{TagError, TagStore};
use crate::types::{TagOutcome, TagSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Separators accepted between artist and title: hyphen, dash variants, underscore
const SEPARATORS: [char; 6] = ['-', '\u{2013}', '\u{2014}', '\u{2012}', '\u{2015}', '_'];

/// Split a file stem into (artist, title) on the first separator
///
/// Returns `None` if there is no separator or either trimmed part is empty.
/// Only the first separator splits, so `"A-B-C"` yields `("A", "B-C")`.
pub fn parse_filename(stem: &str) -> Option<(String, String)> {
    let (artist, title) = stem.split_once(SEPARATORS)?;
    let artist = artist.trim();
    let title = title.trim();

    if artist.is_empty() || title.is_empty() {
        return None;
    }

    Some((artist.to_string(), title.to_string()))
}

/// Tags one file at a time
pub struct TaggingOrchestrator {
    inspector: TagInspector,
    identifier: Identifier,
    store: Arc<dyn TagStore>,
}

impl TaggingOrchestrator {
    pub fn new(store: Arc<dyn TagStore>, identifier: Identifier) -> Self {
        Self {
            inspector: TagInspector::new(Arc::clone(&store)),
            identifier,
            store,
        }
    }

    /// Tag `track`, never failing the caller
    ///
    /// Errors are logged and reported as [`TagOutcome::Failed`].
    pub async fn tag_one(&self, track: &Path, api_key: &str) -> TagOutcome {
        match self.try_tag_one(track, api_key).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(file = %track.display(), "Tagging failed: {}", e);
                TagOutcome::Failed
            }
        }
    }

    async fn try_tag_one(&self, track: &Path, api_key: &str) -> Result<TagOutcome, TagError> {
        if self.inspector.is_tagged(track) {
            info!(file = %track.display(), "Already tagged");
            return Ok(TagOutcome::AlreadyTagged);
        }

        if let Some(tags) = self.identifier.identify(track, api_key).await {
            self.store.write(track, &tags)?;
            info!(
                file = %track.display(),
                artist = tags.artist.as_deref().unwrap_or_default(),
                title = tags.title.as_deref().unwrap_or_default(),
                "Tagged from fingerprint"
            );
            return Ok(TagOutcome::Identified);
        }

        let stem = track
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        match parse_filename(&stem) {
            Some((artist, title)) => {
                self.store.write(track, &TagSet::artist_title(&artist, &title))?;
                warn!(
                    file = %track.display(),
                    artist = %artist,
                    title = %title,
                    "Tagged from filename"
                );
                Ok(TagOutcome::FilenameFallback)
            }
            None => {
                error!(file = %track.display(), "Could not identify or parse filename");
                Ok(TagOutcome::Failed)
            }
        }
    }
}
