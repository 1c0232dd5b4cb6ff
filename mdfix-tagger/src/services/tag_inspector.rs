//! Tag inspection
//!
//! Decides whether a file already carries usable identification metadata.

use crate::services::tag_store::TagStore;
use std::path::Path;
use std::sync::Arc;

/// Checks files for artist and title tags
#[derive(Clone)]
pub struct TagInspector {
    store: Arc<dyn TagStore>,
}

impl TagInspector {
    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self { store }
    }

    /// True only if both artist and title are present and non-empty
    ///
    /// Read failures (corrupt container, unsupported format) count as "not
    /// tagged" so the file is processed rather than skipped.
    pub fn is_tagged(&self, track: &Path) -> bool {
        match self.store.read(track) {
            Ok(tags) => tags.is_identified(),
            Err(e) => {
                tracing::debug!(file = %track.display(), error = %e, "Unreadable tags, treating as untagged");
                false
            }
        }
    }
}
