//! Quarantine and restore of candidate files
//!
//! Untagged files are moved into a working subdirectory of the library root
//! for the duration of a run and moved back afterwards. Every move goes
//! through [`retry_move`] so a file briefly locked by another program does
//! not break the batch.

use crate::services::retry::{retry_move, FailureKind, MoveOutcome, RelocateError, RetryPolicy};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Reserved name of the working subdirectory under the library root
pub const WORKING_DIR_NAME: &str = "_temp_untagged";

/// One quarantined file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantineEntry {
    /// Where the file lived before the run
    pub original: PathBuf,
    /// Where the file lives during the run
    pub quarantined: PathBuf,
}

/// Files moved into the working directory for one run
#[derive(Debug, Clone)]
pub struct QuarantineSet {
    working_dir: PathBuf,
    entries: Vec<QuarantineEntry>,
}

impl QuarantineSet {
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn entries(&self) -> &[QuarantineEntry] {
        &self.entries
    }

    /// Quarantined paths in scan order
    pub fn moved_tracks(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|e| e.quarantined.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Moves files into and out of the working directory
#[derive(Debug, Clone)]
pub struct FileRelocator {
    policy: RetryPolicy,
    audio_extensions: Vec<String>,
}

impl FileRelocator {
    pub fn new(policy: RetryPolicy, audio_extensions: Vec<String>) -> Self {
        Self {
            policy,
            audio_extensions,
        }
    }

    /// Move a single file, retrying transient failures
    pub async fn resilient_move(&self, source: &Path, target: &Path) -> Result<MoveOutcome, RelocateError> {
        let operation_name = format!("move {}", source.display());
        retry_move(
            &operation_name,
            source,
            &self.policy,
            || std::fs::rename(source, target),
            |err| classify_move_error(err, source),
        )
        .await
    }

    /// Move `tracks` into `working_dir` by filename
    ///
    /// Creates the directory if absent. A filename collision inside the
    /// working directory overwrites the earlier file. Files that vanish or
    /// stay stuck are left out of the returned set.
    pub async fn quarantine(&self, tracks: &[PathBuf], working_dir: &Path) -> Result<QuarantineSet, RelocateError> {
        std::fs::create_dir_all(working_dir).map_err(|source| RelocateError::WorkingDir {
            path: working_dir.to_path_buf(),
            source,
        })?;

        let mut entries: Vec<QuarantineEntry> = Vec::with_capacity(tracks.len());

        for track in tracks {
            let Some(file_name) = track.file_name() else {
                warn!(file = %track.display(), "Skipping path without file name");
                continue;
            };
            let target = working_dir.join(file_name);

            if let Some(index) = entries.iter().position(|e| e.quarantined == target) {
                warn!(
                    file = %track.display(),
                    overwritten = %entries[index].original.display(),
                    "Filename collision in working directory, earlier file is overwritten"
                );
                entries.remove(index);
            }

            match self.resilient_move(track, &target).await {
                Ok(MoveOutcome::Moved { .. }) => {
                    debug!(from = %track.display(), to = %target.display(), "Quarantined");
                    entries.push(QuarantineEntry {
                        original: track.clone(),
                        quarantined: target,
                    });
                }
                Ok(MoveOutcome::Stuck) => {
                    warn!(file = %track.display(), "Could not quarantine file, skipping it");
                }
                Err(e) => {
                    warn!(file = %track.display(), "Skipping file: {}", e);
                }
            }
        }

        info!(
            count = entries.len(),
            working_dir = %working_dir.display(),
            "Moved files to working directory"
        );

        Ok(QuarantineSet {
            working_dir: working_dir.to_path_buf(),
            entries,
        })
    }

    /// Move every quarantined file back to where it came from
    ///
    /// Files are restored to their original paths; anything else left
    /// directly in the working directory goes to `library_root`. The working
    /// directory is removed afterwards when empty. A vanished file does not
    /// stop the remaining restores; the first such error is returned at the
    /// end.
    pub async fn restore(&self, set: &QuarantineSet, library_root: &Path) -> Result<(), RelocateError> {
        let mut first_error = None;

        for entry in &set.entries {
            if let Some(parent) = entry.original.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    warn!(dir = %parent.display(), error = %e, "Cannot recreate original directory");
                }
            }

            match self.resilient_move(&entry.quarantined, &entry.original).await {
                Ok(MoveOutcome::Moved { .. }) => {}
                Ok(MoveOutcome::Stuck) => {
                    warn!(file = %entry.quarantined.display(), "File left in working directory");
                }
                Err(e) => {
                    tracing::error!("Restore failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Err(e) = self.restore_all(&set.working_dir, library_root).await {
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Move every audio file directly inside `working_dir` into `original_dir`
    ///
    /// Then tries to remove `working_dir`; failure to do so (not empty,
    /// locked) is ignored.
    pub async fn restore_all(&self, working_dir: &Path, original_dir: &Path) -> Result<(), RelocateError> {
        let mut first_error = None;

        let leftovers: Vec<PathBuf> = match std::fs::read_dir(working_dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && self.is_audio_file(path))
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                warn!(dir = %working_dir.display(), error = %e, "Cannot list working directory");
                Vec::new()
            }
        };

        for path in leftovers {
            let Some(file_name) = path.file_name() else {
                continue;
            };
            let target = original_dir.join(file_name);

            match self.resilient_move(&path, &target).await {
                Ok(MoveOutcome::Moved { .. }) => {
                    debug!(from = %path.display(), to = %target.display(), "Restored");
                }
                Ok(MoveOutcome::Stuck) => {
                    warn!(file = %path.display(), "File left in working directory");
                }
                Err(e) => {
                    tracing::error!("Restore failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Err(e) = std::fs::remove_dir(working_dir) {
            // folder not empty or in use
            debug!(dir = %working_dir.display(), error = %e, "Working directory not removed");
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn is_audio_file(&self, path: &Path) -> bool {
        has_audio_extension(path, &self.audio_extensions)
    }
}

/// Check a path's extension against a list (case-insensitive, without dot)
pub fn has_audio_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
}

/// A rename that fails because the source is gone is not retried
fn classify_move_error(err: &io::Error, source: &Path) -> FailureKind {
    if err.kind() == io::ErrorKind::NotFound && !source.exists() {
        FailureKind::SourceVanished
    } else {
        FailureKind::Transient
    }
}
