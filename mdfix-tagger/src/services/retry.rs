//! Bounded retry for file moves
//!
//! Files in a music library are regularly held open by players, indexers or
//! antivirus scanners, so a failed move is usually retried. A source file
//! that no longer exists is not transient and is reported immediately.
//!
//! **Algorithm:**
//! 1. Attempt operation, up to `max_attempts` times
//! 2. If successful, return `Moved`
//! 3. If the classifier reports the source vanished, return the error at once
//! 4. Otherwise log WARN and sleep `delay` before the next attempt
//! 5. After all attempts failed, make one final attempt; if that fails too,
//!    log ERROR and return `Stuck` instead of an error

use mdfix_common::config::PacingConfig;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Retry settings for file moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before the final attempt
    pub max_attempts: u32,
    /// Delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&PacingConfig::default())
    }
}

impl From<&PacingConfig> for RetryPolicy {
    fn from(config: &PacingConfig) -> Self {
        Self {
            max_attempts: config.move_retry_attempts,
            delay: Duration::from_millis(config.move_retry_delay_ms),
        }
    }
}

/// Classification of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The source file is gone; retrying cannot help
    SourceVanished,
    /// Lock, permission or other condition that may clear up
    Transient,
}

/// Result of a move that did not vanish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Completed after the given number of attempts
    Moved { attempts: u32 },
    /// All attempts failed; the file stays where it was
    Stuck,
}

/// File relocation errors
#[derive(Debug, Error)]
pub enum RelocateError {
    /// Source disappeared, which indicates interference by another process
    #[error("Source file vanished: {path}: {source}")]
    SourceVanished {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Working directory could not be created
    #[error("Cannot create working directory {path}: {source}")]
    WorkingDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Run `operation` under `policy`
///
/// `classify` decides whether an error means the source vanished. `source`
/// is only used for the returned error.
pub async fn retry_move<F, C>(
    operation_name: &str,
    source: &std::path::Path,
    policy: &RetryPolicy,
    mut operation: F,
    classify: C,
) -> Result<MoveOutcome, RelocateError>
where
    F: FnMut() -> io::Result<()>,
    C: Fn(&io::Error) -> FailureKind,
{
    let vanished = |err: io::Error| RelocateError::SourceVanished {
        path: source.to_path_buf(),
        source: err,
    };

    for attempt in 1..=policy.max_attempts {
        match operation() {
            Ok(()) => {
                if attempt > 1 {
                    tracing::debug!(operation = operation_name, attempt, "Move succeeded after retry");
                }
                return Ok(MoveOutcome::Moved { attempts: attempt });
            }
            Err(err) => {
                if classify(&err) == FailureKind::SourceVanished {
                    return Err(vanished(err));
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    "Move failed, will retry after {:?}",
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }

    // final attempt
    match operation() {
        Ok(()) => Ok(MoveOutcome::Moved {
            attempts: policy.max_attempts + 1,
        }),
        Err(err) if classify(&err) == FailureKind::SourceVanished => Err(vanished(err)),
        Err(err) => {
            tracing::error!(
                operation = operation_name,
                attempts = policy.max_attempts + 1,
                error = %err,
                "Move failed permanently, leaving file in place"
            );
            Ok(MoveOutcome::Stuck)
        }
    }
}
