//! Core types shared by the tagging services
//!
//! A track is identified by its path alone; nothing here outlives a run.

use serde::{Deserialize, Serialize};

/// Identification tags of one audio file
///
/// Used both as the read view of a file's metadata container and as the set
/// of values to write. On write only the `Some` fields are touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub date: Option<String>,
}

impl TagSet {
    /// Tag set carrying only artist and title
    pub fn artist_title(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: Some(artist.into()),
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// True if both artist and title are present and non-blank
    pub fn is_identified(&self) -> bool {
        fn present(value: &Option<String>) -> bool {
            value.as_deref().is_some_and(|v| !v.trim().is_empty())
        }
        present(&self.artist) && present(&self.title)
    }
}

/// One candidate returned by the fingerprint match service
///
/// Candidates are kept in the order the service returned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Match confidence (0.0 to 1.0)
    pub score: f64,
    /// MusicBrainz recording MBID
    pub recording_id: String,
    /// Provisional title reported by the match service
    pub title: Option<String>,
    /// Provisional artist reported by the match service
    pub artist: Option<String>,
}

/// Result of tagging one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagOutcome {
    /// File already carried artist and title; nothing was written
    AlreadyTagged,
    /// Tags came from a fingerprint match
    Identified,
    /// Artist and title were parsed from the filename
    FilenameFallback,
    /// No tags could be written
    Failed,
}

impl TagOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, TagOutcome::Failed)
    }
}
