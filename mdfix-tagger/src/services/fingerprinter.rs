//! Audio fingerprinting service using Chromaprint
//!
//! Runs the Chromaprint `fpcalc` tool and parses its JSON output. The tool is
//! located once at startup: configured path, `FPCALC` environment variable,
//! next to the running executable, then `PATH`.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Environment variable that may point at the fpcalc binary
pub const FPCALC_ENV: &str = "FPCALC";

#[cfg(windows)]
const FPCALC_BINARY: &str = "fpcalc.exe";
#[cfg(not(windows))]
const FPCALC_BINARY: &str = "fpcalc";

/// Fingerprinting errors
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("fpcalc not found. Install Chromaprint or place {0} next to the executable")]
    ToolNotFound(String),

    #[error("fpcalc failed for {path}: {message}")]
    ToolFailed { path: String, message: String },

    #[error("Unparseable fpcalc output: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Chromaprint fingerprint of one file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Fingerprint {
    /// Audio duration in seconds
    pub duration: f64,
    /// Compressed, base64-encoded fingerprint as expected by AcoustID
    pub fingerprint: String,
}

impl Fingerprint {
    /// Duration rounded to whole seconds, as sent to AcoustID
    pub fn duration_seconds(&self) -> u64 {
        self.duration.max(0.0).round() as u64
    }
}

/// Computes acoustic fingerprints
#[async_trait]
pub trait Fingerprinter: Send + Sync {
    async fn fingerprint(&self, audio_path: &Path) -> Result<Fingerprint, FingerprintError>;
}

/// Fingerprinter backed by the `fpcalc` command line tool
pub struct FpcalcFingerprinter {
    fpcalc: PathBuf,
    /// Use first N seconds for fingerprinting
    duration_seconds: u32,
}

impl FpcalcFingerprinter {
    pub fn new(fpcalc: PathBuf) -> Self {
        Self {
            fpcalc,
            duration_seconds: 120, // AcoustID recommends 120 seconds
        }
    }

    /// Set fingerprint duration
    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration_seconds = seconds;
        self
    }
}

#[async_trait]
impl Fingerprinter for FpcalcFingerprinter {
    async fn fingerprint(&self, audio_path: &Path) -> Result<Fingerprint, FingerprintError> {
        debug!(file = %audio_path.display(), "Computing Chromaprint fingerprint");

        let output = Command::new(&self.fpcalc)
            .arg("-json")
            .arg("-length")
            .arg(self.duration_seconds.to_string())
            .arg(audio_path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(FingerprintError::ToolFailed {
                path: audio_path.display().to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_fpcalc_output(&output.stdout)
    }
}

/// Parse `fpcalc -json` output
pub fn parse_fpcalc_output(stdout: &[u8]) -> Result<Fingerprint, FingerprintError> {
    let fingerprint: Fingerprint =
        serde_json::from_slice(stdout).map_err(|e| FingerprintError::ParseError(e.to_string()))?;

    if fingerprint.fingerprint.is_empty() {
        return Err(FingerprintError::ParseError("empty fingerprint".to_string()));
    }

    Ok(fingerprint)
}

/// Locate the fpcalc binary
pub fn locate_fpcalc(configured: Option<&Path>) -> Result<PathBuf, FingerprintError> {
    if let Some(path) = configured {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(FingerprintError::ToolNotFound(path.display().to_string()))
        };
    }

    if let Some(path) = std::env::var_os(FPCALC_ENV).map(PathBuf::from) {
        if path.is_file() {
            return Ok(path);
        }
    }

    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(FPCALC_BINARY)));
    if let Some(path) = beside_exe.filter(|p| p.is_file()) {
        return Ok(path);
    }

    std::env::var_os("PATH")
        .and_then(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join(FPCALC_BINARY))
                .find(|candidate| candidate.is_file())
        })
        .ok_or_else(|| FingerprintError::ToolNotFound(FPCALC_BINARY.to_string()))
}
