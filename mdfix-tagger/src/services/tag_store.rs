//! Metadata container read/write
//!
//! Reads and writes the identification tags of audio files using lofty.
//! Supports ID3v2, ID3v1, APE, Vorbis Comments, MP4 and RIFF INFO containers.

use crate::types::TagSet;
use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Tag read/write errors
#[derive(Debug, Error)]
pub enum TagError {
    /// File could not be opened or its container parsed
    #[error("Failed to read tags from {path}: {message}")]
    Read { path: String, message: String },

    /// Tags could not be persisted
    #[error("Failed to write tags to {path}: {message}")]
    Write { path: String, message: String },

    /// Format has no writable tag container
    #[error("Unsupported format: {0}")]
    Unsupported(String),
}

impl TagError {
    fn read(path: &Path, message: impl ToString) -> Self {
        TagError::Read {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    fn write(path: &Path, message: impl ToString) -> Self {
        TagError::Write {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

/// Key-value view of a file's metadata container
pub trait TagStore: Send + Sync {
    /// Read artist, title, album and date
    fn read(&self, path: &Path) -> Result<TagSet, TagError>;

    /// Persist the `Some` fields of `tags`, creating the container if absent
    fn write(&self, path: &Path, tags: &TagSet) -> Result<(), TagError>;
}

/// lofty-backed tag store
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagStore;

impl LoftyTagStore {
    pub fn new() -> Self {
        Self
    }
}

impl TagStore for LoftyTagStore {
    fn read(&self, path: &Path) -> Result<TagSet, TagError> {
        let tagged_file = Probe::open(path)
            .map_err(|e| TagError::read(path, e))?
            .read()
            .map_err(|e| TagError::read(path, e))?;

        // Primary tag (ID3v2 for MP3), falls back to whatever else is present
        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            debug!(file = %path.display(), "No tags found in audio file");
            return Ok(TagSet::default());
        };

        let date = tag
            .get_string(&ItemKey::RecordingDate)
            .map(str::to_string)
            .or_else(|| tag.year().map(|y| y.to_string()));

        Ok(TagSet {
            artist: tag.artist().map(|s| s.to_string()),
            title: tag.title().map(|s| s.to_string()),
            album: tag.album().map(|s| s.to_string()),
            date,
        })
    }

    fn write(&self, path: &Path, tags: &TagSet) -> Result<(), TagError> {
        let mut tagged_file = Probe::open(path)
            .map_err(|e| TagError::read(path, e))?
            .read()
            .map_err(|e| TagError::read(path, e))?;

        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file.tag_mut(tag_type).ok_or_else(|| {
            TagError::Unsupported(format!("{} does not support {:?} tags", path.display(), tag_type))
        })?;

        if let Some(artist) = &tags.artist {
            tag.set_artist(artist.clone());
        }
        if let Some(title) = &tags.title {
            tag.set_title(title.clone());
        }
        if let Some(album) = &tags.album {
            tag.set_album(album.clone());
        }
        if let Some(date) = tags.date.as_ref().filter(|d| !d.is_empty()) {
            tag.insert_text(ItemKey::RecordingDate, date.clone());
        }

        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(|e| TagError::write(path, e))?;

        debug!(
            file = %path.display(),
            artist = ?tags.artist,
            title = ?tags.title,
            "Wrote tags"
        );

        Ok(())
    }
}
