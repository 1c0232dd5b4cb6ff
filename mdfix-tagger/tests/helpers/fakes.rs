//! In-memory stand-ins for the pipeline's external systems
//!
//! Tags are keyed by file name so they follow a file through quarantine and
//! restore, the way embedded tags would.

use async_trait::async_trait;
use mdfix_common::Progress;
use mdfix_tagger::pipeline::ProgressObserver;
use mdfix_tagger::services::{
    AcoustIdError, ArtistCredit, Fingerprint, FingerprintError, Fingerprinter, MatchService,
    MusicBrainzError, Recording, RecordingLookup, Release, TagError, TagStore,
};
use mdfix_tagger::{MatchCandidate, TagSet};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Tag store that keeps tags in memory, by file name
///
/// Reading or writing a path that does not exist on disk fails like a real
/// container would.
#[derive(Default)]
pub struct MemoryTagStore {
    tags: Mutex<HashMap<String, TagSet>>,
    writes: Mutex<Vec<PathBuf>>,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a file as carrying `tags`
    pub fn with_tags(self, name: &str, tags: TagSet) -> Self {
        self.tags.lock().unwrap().insert(name.to_string(), tags);
        self
    }

    pub fn tags_of(&self, name: &str) -> Option<TagSet> {
        self.tags.lock().unwrap().get(name).cloned()
    }

    /// Paths written to, in order
    pub fn writes(&self) -> Vec<PathBuf> {
        self.writes.lock().unwrap().clone()
    }
}

impl TagStore for MemoryTagStore {
    fn read(&self, path: &Path) -> Result<TagSet, TagError> {
        if !path.is_file() {
            return Err(TagError::Read {
                path: path.display().to_string(),
                message: "no such file".to_string(),
            });
        }
        Ok(self.tags_of(&file_name(path)).unwrap_or_default())
    }

    fn write(&self, path: &Path, tags: &TagSet) -> Result<(), TagError> {
        if !path.is_file() {
            return Err(TagError::Write {
                path: path.display().to_string(),
                message: "no such file".to_string(),
            });
        }

        let mut all = self.tags.lock().unwrap();
        let entry = all.entry(file_name(path)).or_default();
        if tags.artist.is_some() {
            entry.artist = tags.artist.clone();
        }
        if tags.title.is_some() {
            entry.title = tags.title.clone();
        }
        if tags.album.is_some() {
            entry.album = tags.album.clone();
        }
        if tags.date.is_some() {
            entry.date = tags.date.clone();
        }

        self.writes.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Tag store that reports every file untagged and panics on write
#[derive(Default)]
pub struct PanickingTagStore;

impl TagStore for PanickingTagStore {
    fn read(&self, path: &Path) -> Result<TagSet, TagError> {
        if !path.is_file() {
            return Err(TagError::Read {
                path: path.display().to_string(),
                message: "no such file".to_string(),
            });
        }
        Ok(TagSet::default())
    }

    fn write(&self, path: &Path, _tags: &TagSet) -> Result<(), TagError> {
        panic!("container parser crashed on {}", path.display());
    }
}

/// Fingerprinter whose fingerprint is the file name
#[derive(Default)]
pub struct FakeFingerprinter {
    failing: HashSet<String>,
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeFingerprinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make fingerprinting of `name` fail
    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fingerprinter for FakeFingerprinter {
    async fn fingerprint(&self, audio_path: &Path) -> Result<Fingerprint, FingerprintError> {
        self.calls.lock().unwrap().push(audio_path.to_path_buf());

        let name = file_name(audio_path);
        if self.failing.contains(&name) {
            return Err(FingerprintError::ToolFailed {
                path: audio_path.display().to_string(),
                message: "decoder error".to_string(),
            });
        }

        Ok(Fingerprint {
            duration: 180.0,
            fingerprint: name,
        })
    }
}

/// Match service answering from a table keyed by fingerprint
#[derive(Default)]
pub struct FakeMatchService {
    candidates: HashMap<String, Vec<MatchCandidate>>,
    lookups: Mutex<usize>,
}

impl FakeMatchService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidates for the file `name`, as `(score, recording_id)` in service order
    pub fn with_candidates(mut self, name: &str, candidates: &[(f64, &str)]) -> Self {
        let candidates = candidates
            .iter()
            .map(|(score, id)| MatchCandidate {
                score: *score,
                recording_id: id.to_string(),
                title: Some(format!("Provisional {}", id)),
                artist: None,
            })
            .collect();
        self.candidates.insert(name.to_string(), candidates);
        self
    }

    pub fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

#[async_trait]
impl MatchService for FakeMatchService {
    async fn lookup(
        &self,
        api_key: &str,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<MatchCandidate>, AcoustIdError> {
        *self.lookups.lock().unwrap() += 1;

        if api_key == "revoked" {
            return Err(AcoustIdError::InvalidApiKey);
        }

        Ok(self
            .candidates
            .get(&fingerprint.fingerprint)
            .cloned()
            .unwrap_or_default())
    }
}

/// Recording database answering from a table keyed by recording id
#[derive(Default)]
pub struct FakeRecordings {
    recordings: HashMap<String, Recording>,
    network_failures: HashSet<String>,
    fetched: Mutex<Vec<String>>,
}

impl FakeRecordings {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recording with one named artist and one release
    pub fn with_recording(mut self, id: &str, artist: &str, title: &str, album: &str, date: &str) -> Self {
        self.recordings.insert(
            id.to_string(),
            Recording {
                id: id.to_string(),
                title: Some(title.to_string()),
                artist_credit: vec![ArtistCredit::Named(artist.to_string())],
                releases: vec![Release {
                    title: Some(album.to_string()),
                    date: Some(date.to_string()),
                }],
            },
        );
        self
    }

    /// Fetching `id` fails with a network error
    pub fn with_network_failure(mut self, id: &str) -> Self {
        self.network_failures.insert(id.to_string());
        self
    }

    /// Recording ids requested, in order
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordingLookup for FakeRecordings {
    async fn lookup_recording(&self, recording_id: &str) -> Result<Recording, MusicBrainzError> {
        self.fetched.lock().unwrap().push(recording_id.to_string());

        if self.network_failures.contains(recording_id) {
            return Err(MusicBrainzError::NetworkError("connection reset".to_string()));
        }

        self.recordings
            .get(recording_id)
            .cloned()
            .ok_or_else(|| MusicBrainzError::RecordingNotFound(recording_id.to_string()))
    }
}

/// Observer that records every progress event
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Progress>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(usize, usize)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|p| (p.completed, p.total))
            .collect()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&self, progress: Progress) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(progress);
        Ok(())
    }
}
