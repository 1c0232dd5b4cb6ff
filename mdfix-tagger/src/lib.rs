//! mdfix-tagger library
//!
//! Finds audio files without artist/title tags, identifies them by acoustic
//! fingerprint (AcoustID + MusicBrainz) and writes the tags back, falling
//! back to "Artist - Title" filenames when identification fails.

pub mod logging;
pub mod pipeline;
pub mod services;
pub mod types;

pub use pipeline::{
    Collaborators, PipelineError, PipelineSettings, ProgressObserver, RunSummary, TaggingPipeline,
};
pub use types::{MatchCandidate, TagOutcome, TagSet};
