//! Library scanner
//!
//! Recursive discovery of audio files under a library root, split into files
//! that still need identification and files that are already tagged.

use crate::services::file_relocator::{has_audio_extension, WORKING_DIR_NAME};
use crate::services::tag_inspector::TagInspector;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Library scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Outcome of one library scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Files lacking artist or title, in walk order
    pub untagged: Vec<PathBuf>,
    /// Audio files that already carry artist and title
    pub already_tagged: usize,
}

impl ScanResult {
    /// Every audio file seen by the scan
    pub fn total(&self) -> usize {
        self.untagged.len() + self.already_tagged
    }
}

/// Audio file scanner
pub struct LibraryScanner {
    audio_extensions: Vec<String>,
    ignore_patterns: Vec<String>,
}

impl LibraryScanner {
    /// Create a scanner for the given extensions (without dot)
    ///
    /// Ignores entries named exactly .DS_Store, Thumbs.db, .git or .svn.
    pub fn new(audio_extensions: Vec<String>) -> Self {
        Self {
            audio_extensions,
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
            ],
        }
    }

    /// All audio files under `root`, sorted by walk order
    ///
    /// Working directories left behind by an interrupted run are never
    /// entered.
    pub fn find_audio_files(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }

        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file()
                        && has_audio_extension(entry.path(), &self.audio_extensions)
                    {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        Ok(files)
    }

    /// Scan `root` and classify every audio file with `inspector`
    pub fn scan(&self, root: &Path, inspector: &TagInspector) -> Result<ScanResult, ScanError> {
        let files = self.find_audio_files(root)?;
        let mut result = ScanResult::default();

        for file in files {
            if inspector.is_tagged(&file) {
                result.already_tagged += 1;
            } else {
                result.untagged.push(file);
            }
        }

        tracing::info!(
            root = %root.display(),
            untagged = result.untagged.len(),
            already_tagged = result.already_tagged,
            "Scan complete"
        );

        Ok(result)
    }

    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        let file_name = entry.file_name().to_string_lossy();

        if entry.file_type().is_dir() && file_name.starts_with(WORKING_DIR_NAME) {
            tracing::debug!(dir = %entry.path().display(), "Skipping working directory");
            return false;
        }

        !self
            .ignore_patterns
            .iter()
            .any(|pattern| file_name == pattern.as_str())
    }
}

impl Default for LibraryScanner {
    fn default() -> Self {
        Self::new(vec!["mp3".to_string()])
    }
}
