//! Tagging pipeline driver
//!
//! One run: validate → scan → quarantine → tag each file → restore → summary.
//!
//! Runs are strictly sequential. A [`TaggingPipeline`] owns its collaborators
//! and keeps no state between runs, so independent pipelines never share
//! bookkeeping.

pub mod progress;

pub use progress::{notify, ChannelObserver, ProgressObserver};

use crate::services::acoustid_client::{AcoustIdClient, MatchService};
use crate::services::file_relocator::{FileRelocator, WORKING_DIR_NAME};
use crate::services::fingerprinter::{Fingerprinter, FpcalcFingerprinter};
use crate::services::identifier::{Identifier, Pacing};
use crate::services::library_scanner::{LibraryScanner, ScanError, ScanResult};
use crate::services::musicbrainz_client::{MusicBrainzClient, RecordingLookup};
use crate::services::retry::{RelocateError, RetryPolicy};
use crate::services::tag_inspector::TagInspector;
use crate::services::tag_store::{LoftyTagStore, TagStore};
use crate::services::tagging_orchestrator::TaggingOrchestrator;
use crate::types::TagOutcome;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use mdfix_common::config::{is_valid_key, validate_root_folder, TomlConfig};
use mdfix_common::Progress;
use serde::Serialize;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing credential or unusable library root; nothing was touched
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    /// Working directory could not be created, or a file vanished during restore
    #[error("Relocation failed: {0}")]
    Relocate(#[from] RelocateError),

    /// A production collaborator could not be constructed
    #[error("Service setup failed: {0}")]
    Setup(String),
}

/// Tunables of a pipeline
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Audio file extensions without dot
    pub audio_extensions: Vec<String>,
    pub retry: RetryPolicy,
    pub pacing: Pacing,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&TomlConfig::default())
    }
}

impl From<&TomlConfig> for PipelineSettings {
    fn from(config: &TomlConfig) -> Self {
        Self {
            audio_extensions: config.audio_extensions.clone(),
            retry: RetryPolicy::from(&config.pacing),
            pacing: Pacing::from(&config.pacing),
        }
    }
}

/// External systems the pipeline talks to
#[derive(Clone)]
pub struct Collaborators {
    pub tag_store: Arc<dyn TagStore>,
    pub fingerprinter: Arc<dyn Fingerprinter>,
    pub match_service: Arc<dyn MatchService>,
    pub recordings: Arc<dyn RecordingLookup>,
}

impl Collaborators {
    /// lofty tags, fpcalc at `fpcalc`, live AcoustID and MusicBrainz
    pub fn production(fpcalc: PathBuf) -> Result<Self, PipelineError> {
        let match_service =
            AcoustIdClient::new().map_err(|e| PipelineError::Setup(e.to_string()))?;
        let recordings =
            MusicBrainzClient::new().map_err(|e| PipelineError::Setup(e.to_string()))?;

        Ok(Self {
            tag_store: Arc::new(LoftyTagStore::new()),
            fingerprinter: Arc::new(FpcalcFingerprinter::new(fpcalc)),
            match_service: Arc::new(match_service),
            recordings: Arc::new(recordings),
        })
    }
}

/// Aggregate result of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Audio files seen by the scan
    pub total: usize,
    /// Files skipped because they were already tagged
    pub already_tagged: usize,
    /// Files tagged in this run, by fingerprint or filename
    pub tagged: usize,
    /// Untagged files that could not be tagged
    pub failed: usize,
    /// Files moved into the working directory
    pub quarantined: usize,
}

impl RunSummary {
    fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            total: 0,
            already_tagged: 0,
            tagged: 0,
            failed: 0,
            quarantined: 0,
        }
    }

    /// Files that carry tags after the run
    pub fn success(&self) -> usize {
        self.already_tagged + self.tagged
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.success(), self.total)
    }
}

/// Tagging pipeline over one library root at a time
pub struct TaggingPipeline {
    scanner: LibraryScanner,
    inspector: TagInspector,
    relocator: FileRelocator,
    orchestrator: TaggingOrchestrator,
}

impl TaggingPipeline {
    pub fn new(settings: PipelineSettings, collaborators: Collaborators) -> Self {
        let identifier = Identifier::new(
            collaborators.fingerprinter,
            collaborators.match_service,
            collaborators.recordings,
            settings.pacing,
        );

        Self {
            scanner: LibraryScanner::new(settings.audio_extensions.clone()),
            inspector: TagInspector::new(Arc::clone(&collaborators.tag_store)),
            relocator: FileRelocator::new(settings.retry, settings.audio_extensions),
            orchestrator: TaggingOrchestrator::new(collaborators.tag_store, identifier),
        }
    }

    /// Scan `library_root` without moving or tagging anything
    pub fn scan(&self, library_root: &Path) -> Result<ScanResult, PipelineError> {
        validate_root(library_root)?;
        Ok(self.scanner.scan(library_root, &self.inspector)?)
    }

    /// Tag every untagged audio file under `library_root`
    ///
    /// **Algorithm:**
    /// 1. Validate the credential and root before touching the filesystem
    /// 2. Scan, skipping tagged files and leftover working directories
    /// 3. Empty scan: report (1,1) and return without quarantine
    /// 4. Quarantine the untagged files
    /// 5. Tag each file in scan order, reporting (index, total) after each
    /// 6. Restore every quarantined file, regardless of per-file outcomes,
    ///    including a panic while tagging one of them
    /// 7. Summarize
    pub async fn run(
        &self,
        library_root: &Path,
        api_key: &str,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<RunSummary, PipelineError> {
        if !is_valid_key(api_key) {
            return Err(PipelineError::Config(
                "AcoustID API key is missing or empty".to_string(),
            ));
        }
        validate_root(library_root)?;

        let mut summary = RunSummary::new(Uuid::new_v4(), Utc::now());
        info!(run_id = %summary.run_id, root = %library_root.display(), "Starting tagging run");

        let scan = self.scanner.scan(library_root, &self.inspector)?;
        summary.total = scan.total();
        summary.already_tagged = scan.already_tagged;

        if scan.untagged.is_empty() {
            info!(run_id = %summary.run_id, files = scan.already_tagged, "All files already tagged");
            notify(progress, Progress::finished_empty());
            return Ok(summary);
        }

        let working_dir = library_root.join(WORKING_DIR_NAME);
        let quarantine = self.relocator.quarantine(&scan.untagged, &working_dir).await?;
        summary.quarantined = quarantine.len();

        let total = quarantine.len();
        for (index, track) in quarantine.moved_tracks().enumerate() {
            // a panicking collaborator fails this file; restore must still run
            let outcome = match AssertUnwindSafe(self.orchestrator.tag_one(track, api_key))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!(file = %track.display(), "Tagging panicked");
                    TagOutcome::Failed
                }
            };
            if outcome.is_success() {
                summary.tagged += 1;
            }

            notify(progress, Progress::new(index + 1, total));
        }

        // files that could not be quarantined were never attempted
        summary.failed = scan.untagged.len() - summary.tagged;

        self.relocator.restore(&quarantine, library_root).await?;

        info!(
            run_id = %summary.run_id,
            tagged = summary.tagged,
            failed = summary.failed,
            already_tagged = summary.already_tagged,
            "Tagging complete: {} files tagged successfully",
            summary
        );

        Ok(summary)
    }
}

fn validate_root(library_root: &Path) -> Result<(), PipelineError> {
    validate_root_folder(library_root)
        .map_err(|mdfix_common::Error::Config(message)| PipelineError::Config(message))
}
